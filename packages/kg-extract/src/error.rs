//! Typed errors for the extraction library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can tell a
//! completion-service failure (retryable, run-level) apart from a fetch
//! failure (skip the URL) or a graph parse failure (surface the raw text).

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during extraction operations.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Completion service failed or returned an unusable response
    #[error("completion service error: {0}")]
    Service(#[from] ServiceError),

    /// Page fetch failed
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Graph parse or serialization failed
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// Writing an output file failed
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Nothing to process
    #[error("no pages to process")]
    NoPages,
}

/// Errors raised at the completion-service boundary.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Network error (connection failed, body unreadable)
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response from the service
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The call did not finish in time
    #[error("{prompt} timed out after {after:?}")]
    Timeout { prompt: String, after: Duration },

    /// Response did not have the declared shape
    #[error("malformed response from {prompt}: {reason}")]
    MalformedResponse { prompt: String, reason: String },

    /// Request is missing a declared input
    #[error("{prompt} is missing input `{field}`")]
    MissingInput { prompt: String, field: String },

    /// Configuration error (missing API key, invalid settings)
    #[error("config error: {0}")]
    Config(String),
}

/// Errors that can occur while fetching a page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// URL could not be parsed
    #[error("invalid URL `{url}`: {message}")]
    InvalidUrl { url: String, message: String },

    /// Non-2xx response
    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// Service reported failure
    #[error("scrape of {url} reported failure: {reason}")]
    Unsuccessful { url: String, reason: String },

    /// Response carried no usable content
    #[error("no content returned for {url}")]
    MissingContent { url: String },

    /// Fetch timed out
    #[error("timeout fetching: {url}")]
    Timeout { url: String },

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

/// Errors at the graph parse/serialize boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GraphError {
    /// Input is not valid in the given syntax
    #[error("invalid {format}: {message}")]
    Parse { format: String, message: String },

    /// Graph cannot be written in the given syntax
    #[error("cannot serialize as {format}: {message}")]
    Serialize { format: String, message: String },

    /// A generated node reference is not a valid IRI
    #[error("invalid IRI `{iri}`: {message}")]
    InvalidIri { iri: String, message: String },
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Result type alias for completion-service calls.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;
