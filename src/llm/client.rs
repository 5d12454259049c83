use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::conversation::Message;
use crate::tool::{ToolCall, ToolDefinition};

/// Input for one completion call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// The model to use
    pub model: String,
    /// The full transcript to complete
    pub messages: Vec<Message>,
    /// Tool schemas offered to the model; empty offers none
    pub tools: Vec<ToolDefinition>,
    /// Tool selection policy, when tools are offered
    pub tool_choice: Option<ToolChoice>,
    /// Optional sampling temperature
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// A plain completion: no tools offered, default sampling.
    pub fn plain(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: Vec::new(),
            tool_choice: None,
            temperature: None,
        }
    }
}

/// Tool selection policy sent with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    /// The model decides whether to call a tool
    Auto,
    /// Tool calls are disallowed
    None,
}

/// The reason a completion stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop point reached
    Stop,
    /// Stopped to issue tool calls
    ToolCalls,
    /// Token limit reached
    MaxTokens,
    /// Anything else the API reported
    Other,
}

/// Token usage reported by the API.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// A parsed completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated text, when the model produced any
    pub content: Option<String>,
    /// Structured tool calls, in the order issued
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

/// Errors from the completion API.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The API rejected the request
    #[error("API error: {0}")]
    Api(String),
    /// The request never completed
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// The response body was not the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),
}

/// Seam for the hosted completion service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Sends one request and returns the parsed completion.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}
