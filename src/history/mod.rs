//! Durable conversation storage.
//!
//! The orchestration loop mirrors each completed turn here and consults it
//! when a conversation id is not in memory. Durability is best-effort: a
//! failing backend is logged and never fails a turn.

pub mod memory;
pub mod supabase;

pub use memory::MemoryHistory;
pub use supabase::SupabaseHistory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conversation::Message;

/// A persisted conversation row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredConversation {
    pub conversation_id: String,
    pub user_id: String,
    pub messages: Vec<Message>,
}

/// Errors from a history backend.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("history backend error: {0}")]
    Backend(String),
}

/// Backend contract for conversation persistence.
#[async_trait]
pub trait ConversationHistory: Send + Sync {
    /// Upserts the full transcript for a conversation.
    async fn save(
        &self,
        user_id: &str,
        conversation_id: &str,
        messages: &[Message],
    ) -> Result<(), HistoryError>;

    /// Loads a transcript, or `None` when the conversation was never saved.
    async fn load(&self, conversation_id: &str) -> Result<Option<Vec<Message>>, HistoryError>;

    /// Deletes one conversation.
    async fn delete(&self, conversation_id: &str) -> Result<(), HistoryError>;

    /// Deletes every conversation belonging to a user.
    async fn delete_user(&self, user_id: &str) -> Result<(), HistoryError>;

    /// Lists a user's stored conversations.
    async fn list(&self, user_id: &str) -> Result<Vec<StoredConversation>, HistoryError>;
}
