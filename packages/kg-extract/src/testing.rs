//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the graph pipelines
//! without making real model or network calls.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{ServiceError, ServiceResult};
use crate::traits::completion::{CompletionRequest, CompletionResponse, CompletionService};

pub use crate::ingestors::MockFetcher;

type Responder = Arc<dyn Fn(&CompletionRequest) -> ServiceResult<CompletionResponse> + Send + Sync>;
type Delay = Arc<dyn Fn(&CompletionRequest) -> Duration + Send + Sync>;

/// A mock completion service for testing.
///
/// Responses are configured per prompt name. Clones share their
/// configuration and call log, so a test can hand one clone to a pipeline
/// and inspect the calls through another.
#[derive(Clone, Default)]
pub struct MockCompletion {
    /// Responders by prompt name
    responders: Arc<RwLock<HashMap<&'static str, Responder>>>,

    /// Artificial latency by prompt name
    delays: Arc<RwLock<HashMap<&'static str, Delay>>>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockCall>>>,
}

/// Record of a call made to the mock service.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub prompt: &'static str,
    pub inputs: Vec<(&'static str, String)>,
}

impl MockCall {
    /// Get an input value by name.
    pub fn input(&self, name: &str) -> Option<&str> {
        self.inputs
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }
}

impl MockCompletion {
    /// Create a mock with no configured responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `prompt` with a fixed value for `output`.
    pub fn with_fixed(
        self,
        prompt: &'static str,
        output: &'static str,
        value: impl Into<String>,
    ) -> Self {
        let value = value.into();
        self.with_responder(prompt, move |_| {
            Ok(CompletionResponse::new().with_output(output, value.clone()))
        })
    }

    /// Compute one output from the request.
    pub fn with_output_fn<F>(self, prompt: &'static str, output: &'static str, f: F) -> Self
    where
        F: Fn(&CompletionRequest) -> String + Send + Sync + 'static,
    {
        self.with_responder(prompt, move |request| {
            Ok(CompletionResponse::new().with_output(output, f(request)))
        })
    }

    /// Full control over the response for `prompt`.
    pub fn with_responder<F>(self, prompt: &'static str, f: F) -> Self
    where
        F: Fn(&CompletionRequest) -> ServiceResult<CompletionResponse> + Send + Sync + 'static,
    {
        self.responders.write().unwrap().insert(prompt, Arc::new(f));
        self
    }

    /// Answer `prompt` with a service error whenever `input` equals `value`.
    ///
    /// Other requests for the same prompt keep their configured response.
    pub fn failing_when(
        self,
        prompt: &'static str,
        input: &'static str,
        value: impl Into<String>,
    ) -> Self {
        let value = value.into();
        let fallback = self.responders.read().unwrap().get(prompt).cloned();

        self.with_responder(prompt, move |request| {
            if request.get(input) == Some(value.as_str()) {
                return Err(ServiceError::Api {
                    status: 500,
                    message: format!("mock failure for {} = {}", input, value),
                });
            }
            match &fallback {
                Some(respond) => respond(request),
                None => Err(no_response(request)),
            }
        })
    }

    /// Sleep before answering `prompt`.
    pub fn with_delay<F>(self, prompt: &'static str, f: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Duration + Send + Sync + 'static,
    {
        self.delays.write().unwrap().insert(prompt, Arc::new(f));
        self
    }

    /// Get all recorded calls, in the order they were made.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.read().unwrap().clone()
    }

    /// Get the recorded calls for one prompt.
    pub fn calls_for(&self, prompt: &str) -> Vec<MockCall> {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|c| c.prompt == prompt)
            .cloned()
            .collect()
    }
}

fn no_response(request: &CompletionRequest) -> ServiceError {
    ServiceError::Config(format!(
        "MockCompletion has no response configured for {}",
        request.prompt.name
    ))
}

#[async_trait]
impl CompletionService for MockCompletion {
    async fn complete(&self, request: &CompletionRequest) -> ServiceResult<CompletionResponse> {
        self.calls.write().unwrap().push(MockCall {
            prompt: request.prompt.name,
            inputs: request.inputs.clone(),
        });

        let delay = self
            .delays
            .read()
            .unwrap()
            .get(request.prompt.name)
            .map(|f| f(request));
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let responder = self
            .responders
            .read()
            .unwrap()
            .get(request.prompt.name)
            .cloned();

        match responder {
            Some(respond) => respond(request),
            None => Err(no_response(request)),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Deterministic stand-in for a model-driven merge.
///
/// Keeps every line of `current` and appends the lines of `new` that are not
/// already present, skipping blank lines. Folding with this is
/// order-sensitive, which makes it useful for checking fold order.
pub fn union_lines(current: &str, new: &str) -> String {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut merged: Vec<&str> = Vec::new();

    for line in current.lines().chain(new.lines()) {
        let line = line.trim_end();
        if line.trim().is_empty() || !seen.insert(line) {
            continue;
        }
        merged.push(line);
    }

    merged.join("\n")
}
