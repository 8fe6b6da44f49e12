//! Completion service trait - the single seam to the language model.
//!
//! Every semantic decision in the pipelines (entity resolution, conflict
//! resolution, ontology shape) is delegated to a completion call. Calls are
//! declared as fixed-shape [`Prompt`]s with named inputs and outputs, so a
//! deterministic stub can stand in for the model in tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde_json::Value;
use tracing::debug;

use crate::error::{ServiceError, ServiceResult};

/// A named text field of a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name (used as the key in requests and responses)
    pub name: &'static str,

    /// What the field holds, shown to the model
    pub description: &'static str,
}

impl FieldSpec {
    pub const fn new(name: &'static str, description: &'static str) -> Self {
        Self { name, description }
    }
}

/// Declaration of one kind of completion call.
#[derive(Debug)]
pub struct Prompt {
    /// Stable name, used in logs and errors
    pub name: &'static str,

    /// Task instructions
    pub instructions: &'static str,

    /// Inputs the caller must supply
    pub inputs: &'static [FieldSpec],

    /// Outputs the service must return
    pub outputs: &'static [FieldSpec],

    /// Ask the model to reason before answering
    pub chain_of_thought: bool,

    /// JSON schema of the whole reply, for services that support
    /// structured output
    pub response_schema: Option<fn() -> Value>,
}

/// JSON schema for a structured reply of type `T`.
///
/// Subschemas are inlined, every object is closed
/// (`additionalProperties: false`) and lists all of its properties as
/// required, which is what strict structured-output modes accept.
pub fn strict_schema<T: JsonSchema>() -> Value {
    let generator = SchemaSettings::draft07()
        .with(|s| {
            s.inline_subschemas = true;
            s.meta_schema = None;
        })
        .into_generator();

    let mut schema = serde_json::to_value(generator.into_root_schema_for::<T>()).unwrap_or_default();
    close_objects(&mut schema);
    schema
}

fn close_objects(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("object") {
                let required: Vec<Value> = map
                    .get("properties")
                    .and_then(Value::as_object)
                    .map(|props| props.keys().cloned().map(Value::String).collect())
                    .unwrap_or_default();
                map.insert("required".to_string(), Value::Array(required));
                map.insert("additionalProperties".to_string(), Value::Bool(false));
            }
            map.values_mut().for_each(close_objects);
        }
        Value::Array(items) => items.iter_mut().for_each(close_objects),
        _ => {}
    }
}

/// A completion call: a prompt plus its named inputs, in declaration order.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: &'static Prompt,
    pub inputs: Vec<(&'static str, String)>,
}

impl CompletionRequest {
    /// Start a request for the given prompt.
    pub fn new(prompt: &'static Prompt) -> Self {
        Self {
            prompt,
            inputs: Vec::with_capacity(prompt.inputs.len()),
        }
    }

    /// Set a named input.
    pub fn input(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.inputs.push((name, value.into()));
        self
    }

    /// Get an input value by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inputs
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Check that every declared input was supplied.
    pub fn validate(&self) -> ServiceResult<()> {
        for field in self.prompt.inputs {
            if self.get(field.name).is_none() {
                return Err(ServiceError::MissingInput {
                    prompt: self.prompt.name.to_string(),
                    field: field.name.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Named text outputs returned by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionResponse {
    outputs: HashMap<String, String>,
}

impl CompletionResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an output (builder style).
    pub fn with_output(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.outputs.insert(name.into(), value.into());
        self
    }

    /// Get an output by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.outputs.get(name).map(String::as_str)
    }

    /// Remove and return an output, failing if the service did not return it.
    pub fn take(&mut self, prompt: &Prompt, name: &str) -> ServiceResult<String> {
        self.outputs
            .remove(name)
            .ok_or_else(|| ServiceError::MalformedResponse {
                prompt: prompt.name.to_string(),
                reason: format!("missing output `{}`", name),
            })
    }

    /// Check that every declared output is present.
    pub fn validate(&self, prompt: &Prompt) -> ServiceResult<()> {
        for field in prompt.outputs {
            if !self.outputs.contains_key(field.name) {
                return Err(ServiceError::MalformedResponse {
                    prompt: prompt.name.to_string(),
                    reason: format!("missing output `{}`", field.name),
                });
            }
        }
        Ok(())
    }
}

/// Completion service trait.
///
/// Implementations wrap a specific LLM provider. Handles are passed
/// explicitly to each pipeline; there is no process-wide client.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Run one completion call.
    async fn complete(&self, request: &CompletionRequest) -> ServiceResult<CompletionResponse>;

    /// Run one completion call with shape validation and a deadline.
    ///
    /// Missing inputs fail before the call, a late call fails with
    /// [`ServiceError::Timeout`], and missing outputs fail with
    /// [`ServiceError::MalformedResponse`].
    async fn complete_within(
        &self,
        request: &CompletionRequest,
        timeout: Duration,
    ) -> ServiceResult<CompletionResponse> {
        request.validate()?;

        let start = Instant::now();
        let response = tokio::time::timeout(timeout, self.complete(request))
            .await
            .map_err(|_| ServiceError::Timeout {
                prompt: request.prompt.name.to_string(),
                after: timeout,
            })??;

        response.validate(request.prompt)?;

        debug!(
            service = self.name(),
            prompt = request.prompt.name,
            duration_ms = start.elapsed().as_millis(),
            "Completion call finished"
        );

        Ok(response)
    }

    /// Get the service name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}

#[async_trait]
impl<T: CompletionService + ?Sized> CompletionService for Arc<T> {
    async fn complete(&self, request: &CompletionRequest) -> ServiceResult<CompletionResponse> {
        (**self).complete(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static ECHO: Prompt = Prompt {
        name: "Echo",
        instructions: "Repeat the input.",
        inputs: &[FieldSpec::new("text", "text to repeat")],
        outputs: &[FieldSpec::new("echo", "the same text")],
        chain_of_thought: false,
        response_schema: None,
    };

    struct Echo;

    #[async_trait]
    impl CompletionService for Echo {
        async fn complete(&self, request: &CompletionRequest) -> ServiceResult<CompletionResponse> {
            Ok(CompletionResponse::new().with_output("echo", request.get("text").unwrap_or("")))
        }
    }

    struct Silent;

    #[async_trait]
    impl CompletionService for Silent {
        async fn complete(&self, _request: &CompletionRequest) -> ServiceResult<CompletionResponse> {
            Ok(CompletionResponse::new())
        }
    }

    struct Slow;

    #[async_trait]
    impl CompletionService for Slow {
        async fn complete(&self, _request: &CompletionRequest) -> ServiceResult<CompletionResponse> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(CompletionResponse::new().with_output("echo", "late"))
        }
    }

    #[tokio::test]
    async fn test_complete_within_returns_outputs() {
        let request = CompletionRequest::new(&ECHO).input("text", "hello");
        let mut response = Echo
            .complete_within(&request, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(response.take(&ECHO, "echo").unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_missing_input_rejected_before_call() {
        let request = CompletionRequest::new(&ECHO);
        let err = Echo
            .complete_within(&request, Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::MissingInput { ref field, .. } if field == "text"));
    }

    #[tokio::test]
    async fn test_missing_output_is_malformed() {
        let request = CompletionRequest::new(&ECHO).input("text", "hello");
        let err = Silent
            .complete_within(&request, Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_slow_call_times_out() {
        let request = CompletionRequest::new(&ECHO).input("text", "hello");
        let err = Slow
            .complete_within(&request, Duration::from_millis(50))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Timeout { .. }));
    }

    #[derive(schemars::JsonSchema)]
    #[allow(dead_code)]
    struct Reply {
        label: String,
        note: Option<String>,
        items: Vec<Item>,
    }

    #[derive(schemars::JsonSchema)]
    #[allow(dead_code)]
    struct Item {
        name: String,
    }

    #[test]
    fn test_strict_schema_closes_objects() {
        let schema = strict_schema::<Reply>();

        assert_eq!(schema["type"], "object");
        assert_eq!(schema["additionalProperties"], false);
        assert_eq!(schema["required"].as_array().unwrap().len(), 3);
        assert!(schema.get("$schema").is_none());
        assert!(schema.get("definitions").is_none());

        let item = &schema["properties"]["items"]["items"];
        assert_eq!(item["type"], "object");
        assert_eq!(item["additionalProperties"], false);
        assert_eq!(item["required"], serde_json::json!(["name"]));
    }

    #[tokio::test]
    async fn test_arc_delegates() {
        let service: Arc<dyn CompletionService> = Arc::new(Echo);
        let request = CompletionRequest::new(&ECHO).input("text", "shared");
        let response = service
            .complete_within(&request, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(response.get("echo"), Some("shared"));
    }
}
