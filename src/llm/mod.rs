pub mod client;
pub mod openai;

pub use client::{
    CompletionClient, CompletionRequest, CompletionResponse, FinishReason, LlmError, ToolChoice,
    Usage,
};
pub use openai::{DEFAULT_BASE_URL, OpenAiClient};
