//! OpenAI implementation of the completion service.
//!
//! Each [`Prompt`] is rendered as a system message (instructions plus the
//! output fields to return) and a user message (the named inputs). The model
//! is asked for a JSON object keyed by output name. Prompts that declare a
//! response schema are sent in strict `json_schema` mode instead.
//!
//! # Example
//!
//! ```rust,ignore
//! use kg_extract::ai::OpenAiCompletion;
//! use kg_extract::pipeline::Extractor;
//!
//! let ai = OpenAiCompletion::from_env()?.with_model("gpt-4o");
//! let extraction = Extractor::new(ai).extract("Climate Change", text).await?;
//! ```

use std::fmt::Write as _;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ServiceError, ServiceResult};
use crate::security::ApiKey;
use crate::traits::completion::{CompletionRequest, CompletionResponse, CompletionService, Prompt};

const REASONING_KEY: &str = "reasoning";

/// OpenAI chat-completions backed service.
#[derive(Clone)]
pub struct OpenAiCompletion {
    client: Client,
    api_key: ApiKey,
    model: String,
    base_url: String,
    temperature: f32,
}

impl OpenAiCompletion {
    /// Create a new OpenAI client with the given API key.
    pub fn new(api_key: impl Into<ApiKey>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            temperature: 0.0,
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> ServiceResult<Self> {
        let api_key = ApiKey::from_env("OPENAI_API_KEY")
            .ok_or_else(|| ServiceError::Config("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set the chat model (default: gpt-4o-mini).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the sampling temperature (default: 0.0).
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Get the current model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the sampling temperature.
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    async fn chat(
        &self,
        system: String,
        user: String,
        response_format: ResponseFormat,
    ) -> ServiceResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.temperature,
            response_format,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", self.api_key.bearer())
            .json(&request)
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ServiceError::Api {
                status: status.as_u16(),
                message: "No response from OpenAI".to_string(),
            })
    }
}

/// Response format for a prompt: strict JSON schema when the prompt
/// declares one, plain JSON object mode otherwise.
fn response_format(prompt: &Prompt) -> ResponseFormat {
    match prompt.response_schema {
        Some(schema) => ResponseFormat {
            format_type: "json_schema",
            json_schema: Some(JsonSchemaFormat {
                name: prompt.name,
                strict: true,
                schema: schema(),
            }),
        },
        None => ResponseFormat {
            format_type: "json_object",
            json_schema: None,
        },
    }
}

/// System message for a prompt.
pub fn system_message(prompt: &Prompt) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", prompt.instructions);
    out.push_str("\nYou will be given these inputs:\n");
    for field in prompt.inputs {
        let _ = writeln!(out, "- {}: {}", field.name, field.description);
    }

    out.push_str("\nRespond with a single JSON object with these string fields:\n");
    if prompt.chain_of_thought {
        let _ = writeln!(
            out,
            "- {}: Think step by step in order to produce the remaining fields.",
            REASONING_KEY
        );
    }
    for field in prompt.outputs {
        let _ = writeln!(out, "- {}: {}", field.name, field.description);
    }
    out
}

/// User message for a request: each input under its own heading.
pub fn user_message(request: &CompletionRequest) -> String {
    request
        .inputs
        .iter()
        .map(|(name, value)| format!("## {}\n{}", name, value))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Map the model's JSON object to named outputs.
///
/// String values are taken as-is; any other JSON value is kept as its JSON
/// text.
pub fn parse_outputs(prompt: &Prompt, content: &str) -> ServiceResult<CompletionResponse> {
    let object: Map<String, Value> =
        serde_json::from_str(content).map_err(|e| ServiceError::MalformedResponse {
            prompt: prompt.name.to_string(),
            reason: format!("reply is not a JSON object: {}", e),
        })?;

    if let Some(reasoning) = object.get(REASONING_KEY).and_then(Value::as_str) {
        debug!(prompt = prompt.name, reasoning, "Model reasoning");
    }

    let mut response = CompletionResponse::new();
    for field in prompt.outputs {
        match object.get(field.name) {
            Some(Value::String(s)) => response = response.with_output(field.name, s.clone()),
            Some(Value::Null) | None => {}
            Some(other) => response = response.with_output(field.name, other.to_string()),
        }
    }
    Ok(response)
}

#[async_trait]
impl CompletionService for OpenAiCompletion {
    async fn complete(&self, request: &CompletionRequest) -> ServiceResult<CompletionResponse> {
        let content = self
            .chat(
                system_message(request.prompt),
                user_message(request),
                response_format(request.prompt),
            )
            .await?;
        parse_outputs(request.prompt, &content)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// =============================================================================
// OpenAI API Types
// =============================================================================

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    json_schema: Option<JsonSchemaFormat>,
}

#[derive(Serialize)]
struct JsonSchemaFormat {
    name: &'static str,
    strict: bool,
    schema: Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}
