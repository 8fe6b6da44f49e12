//! Completion service implementations.
//!
//! This module provides reference implementations of the
//! `CompletionService` trait. Users can use these directly or implement
//! their own.

#[cfg(feature = "openai")]
mod openai;

#[cfg(feature = "openai")]
pub use openai::{parse_outputs, system_message, user_message, OpenAiCompletion};
