//! Data types shared by the pipelines.

pub mod config;
pub mod fragment;
pub mod page;
pub mod triple;
