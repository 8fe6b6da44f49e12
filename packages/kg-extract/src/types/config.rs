//! Configuration types for the extraction pipelines.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What a pipeline does when one page's completion call fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log the failure, leave accumulated state untouched, continue.
    #[default]
    SkipPage,

    /// Stop the whole run on the first failure.
    Abort,
}

/// Configuration shared by the multi-page pipelines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Deadline for each completion call.
    ///
    /// Default: 120 seconds.
    pub call_timeout: Duration,

    /// Per-page failure handling.
    ///
    /// Default: SkipPage.
    pub failure_policy: FailurePolicy,

    /// Schema seeding runs only when there are more pages than this.
    ///
    /// Default: 3.
    pub schema_threshold: usize,

    /// Number of leading pages sampled for schema inference.
    ///
    /// Default: 3.
    pub schema_sample_size: usize,

    /// Characters of each page shown to the common-schema call.
    ///
    /// Default: 1000.
    pub schema_excerpt_chars: usize,

    /// Maximum concurrent instance-extraction calls.
    ///
    /// Default: 4.
    pub concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(120),
            failure_policy: FailurePolicy::SkipPage,
            schema_threshold: 3,
            schema_sample_size: 3,
            schema_excerpt_chars: 1000,
            concurrency: 4,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-call timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Set the failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Abort on the first failed call.
    pub fn fail_fast(self) -> Self {
        self.with_failure_policy(FailurePolicy::Abort)
    }

    /// Set the schema seeding threshold.
    pub fn with_schema_threshold(mut self, threshold: usize) -> Self {
        self.schema_threshold = threshold;
        self
    }

    /// Set how many pages are sampled for schema inference.
    pub fn with_schema_sample_size(mut self, size: usize) -> Self {
        self.schema_sample_size = size;
        self
    }

    /// Set the per-page excerpt length for schema extraction.
    pub fn with_schema_excerpt_chars(mut self, chars: usize) -> Self {
        self.schema_excerpt_chars = chars;
        self
    }

    /// Set concurrency (clamped to at least 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}
