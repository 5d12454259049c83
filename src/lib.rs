//! # Luna Bot
//!
//! A conversational chat-bot backend that proxies user messages to a
//! hosted LLM completion API, with tool calling and per-conversation
//! history.
//!
//! ## Features
//!
//! - **Turn Loop**: one tool-calling round per turn, with a fallback
//!   parser for pseudo-calls the model embeds in plain text
//! - **Tool System**: trait-based tools with builtin web search, image
//!   search, news lookup, Wikipedia, webpage reading, QR generation,
//!   email dispatch, and remote code execution
//! - **Conversation Store**: per-id transcripts behind per-conversation
//!   locks, seeded with a per-user system prompt
//! - **Durable History**: best-effort mirroring to Supabase or memory
//! - **HTTP Surface**: thin axum routes over the turn loop
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use luna_bot::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let http = reqwest::Client::builder()
//!         .timeout(config.request_timeout)
//!         .build()?;
//!
//!     let llm = Arc::new(OpenAiClient::new(
//!         http.clone(),
//!         config.api_key.clone(),
//!         config.base_url.clone(),
//!     ));
//!     let registry = Arc::new(builtin_registry(&http, &config));
//!     let prompts = Arc::new(SystemPromptManager::new());
//!     let store = Arc::new(ConversationStore::new(
//!         prompts,
//!         Arc::new(MemoryHistory::new()),
//!     ));
//!
//!     let agent = Agent::new(store, llm, registry, AgentConfig::from(&config));
//!     let answer = agent.chat("Hello!", None, None).await;
//!     println!("{answer}");
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod config;
pub mod conversation;
pub mod history;
pub mod llm;
pub mod server;
pub mod tool;

// Re-exports for convenient usage
pub use agent::{Agent, AgentConfig, TurnError};
pub use config::Config;
pub use conversation::{
    Conversation, ConversationStore, DEFAULT_CONVERSATION_ID, DEFAULT_USER_ID, Message, Role,
    SystemPromptManager,
};
pub use history::{ConversationHistory, MemoryHistory, SupabaseHistory};
pub use llm::{CompletionClient, CompletionRequest, CompletionResponse, LlmError, OpenAiClient};
pub use tool::{DynTool, Tool, ToolCall, ToolError, ToolRegistry, builtin::builtin_registry};

/// Prelude module with commonly used types.
pub mod prelude {
    pub use crate::agent::{Agent, AgentConfig};
    pub use crate::config::Config;
    pub use crate::conversation::{ConversationStore, Message, Role, SystemPromptManager};
    pub use crate::history::MemoryHistory;
    pub use crate::llm::{CompletionClient, OpenAiClient};
    pub use crate::tool::{Tool, ToolRegistry, builtin::builtin_registry};
}
