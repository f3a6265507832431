//! AI gateway client
//!
//! The gateway speaks the OpenAI chat-completions wire format. Each call
//! carries exactly one `function` tool and forces the model to call it, so
//! the structured result arrives as the tool call's `arguments`.

use async_trait::async_trait;
use lucid_common::config::GatewaySettings;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::actions::ActionSpec;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Non-2xx answer from the gateway
    #[error("Gateway returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    /// Response body is not a chat-completions response
    #[error("Invalid gateway response: {0}")]
    Decode(String),

    #[error("No tool call in gateway response")]
    MissingToolCall,

    #[error("Invalid tool call arguments: {0}")]
    InvalidArguments(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionName {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolChoice {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionName,
}

/// Chat-completions request with a single forced tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: ToolChoice,
}

impl ChatRequest {
    /// Build the request for `action` with the given messages
    pub fn for_action(model: &str, action: &ActionSpec, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.to_string(),
            messages,
            tools: vec![ToolDefinition {
                kind: "function".to_string(),
                function: FunctionDefinition {
                    name: action.id.to_string(),
                    description: action.description.to_string(),
                    parameters: action.output_schema(),
                },
            }],
            tool_choice: ToolChoice {
                kind: "function".to_string(),
                function: FunctionName {
                    name: action.id.to_string(),
                },
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON text per the wire format; some gateways send an object instead
    pub arguments: Value,
}

impl ChatResponse {
    /// Response carrying one tool call with the given arguments text
    pub fn with_tool_call(name: &str, arguments: impl Into<String>) -> Self {
        Self {
            choices: vec![Choice {
                message: ResponseMessage {
                    content: None,
                    tool_calls: Some(vec![ToolCall {
                        function: FunctionCall {
                            name: name.to_string(),
                            arguments: Value::String(arguments.into()),
                        },
                    }]),
                },
            }],
        }
    }
}

/// Pull the structured output out of the first tool call
///
/// The arguments must decode to a JSON object holding every field in
/// `required`.
pub fn extract_tool_output(response: &ChatResponse, required: &[String]) -> Result<Value, GatewayError> {
    let call = response
        .choices
        .first()
        .and_then(|choice| choice.message.tool_calls.as_ref())
        .and_then(|calls| calls.first())
        .ok_or(GatewayError::MissingToolCall)?;

    let output = match &call.function.arguments {
        Value::String(text) => serde_json::from_str::<Value>(text)
            .map_err(|e| GatewayError::InvalidArguments(e.to_string()))?,
        other => other.clone(),
    };

    let object = output
        .as_object()
        .ok_or_else(|| GatewayError::InvalidArguments("arguments are not a JSON object".to_string()))?;

    let missing: Vec<&str> = required
        .iter()
        .filter(|field| !object.contains_key(field.as_str()))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(GatewayError::InvalidArguments(format!(
            "missing fields: {}",
            missing.join(", ")
        )));
    }

    Ok(output)
}

/// Chat-completions backend
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, GatewayError>;
}

/// Gateway reached over HTTP with a bearer API key
pub struct HttpGateway {
    http_client: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpGateway {
    pub fn new(settings: &GatewaySettings) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            url: settings.url.clone(),
            api_key: settings.api_key.clone(),
        })
    }
}

#[async_trait]
impl CompletionGateway for HttpGateway {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, GatewayError> {
        tracing::debug!(model = %request.model, tool = %request.tool_choice.function.name, "Calling AI gateway");

        let response = self
            .http_client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}
