//! Core trait abstractions for the extraction library.
//!
//! These traits define the interfaces to the two external collaborators:
//! the completion service (LLM) and the page fetcher (scraping API).

pub mod completion;
pub mod fetcher;
