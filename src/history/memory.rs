use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{ConversationHistory, HistoryError, StoredConversation};
use crate::conversation::Message;

/// In-process history backend, used when no durable store is configured
/// and as the test double for the trait.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    rows: Mutex<HashMap<String, StoredConversation>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationHistory for MemoryHistory {
    async fn save(
        &self,
        user_id: &str,
        conversation_id: &str,
        messages: &[Message],
    ) -> Result<(), HistoryError> {
        let mut rows = self.rows.lock().await;
        rows.insert(
            conversation_id.to_string(),
            StoredConversation {
                conversation_id: conversation_id.to_string(),
                user_id: user_id.to_string(),
                messages: messages.to_vec(),
            },
        );
        Ok(())
    }

    async fn load(&self, conversation_id: &str) -> Result<Option<Vec<Message>>, HistoryError> {
        let rows = self.rows.lock().await;
        Ok(rows.get(conversation_id).map(|row| row.messages.clone()))
    }

    async fn delete(&self, conversation_id: &str) -> Result<(), HistoryError> {
        self.rows.lock().await.remove(conversation_id);
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), HistoryError> {
        self.rows.lock().await.retain(|_, row| row.user_id != user_id);
        Ok(())
    }

    async fn list(&self, user_id: &str) -> Result<Vec<StoredConversation>, HistoryError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .values()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let history = MemoryHistory::new();
        let messages = vec![Message::system("seed"), Message::user("hi")];
        history.save("alice", "conv-1", &messages).await.unwrap();

        let loaded = history.load("conv-1").await.unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].content, "hi");
    }

    #[tokio::test]
    async fn missing_conversation_loads_as_none() {
        let history = MemoryHistory::new();
        assert!(history.load("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_user_removes_only_that_users_rows() {
        let history = MemoryHistory::new();
        history.save("alice", "a-1", &[Message::user("x")]).await.unwrap();
        history.save("bob", "b-1", &[Message::user("y")]).await.unwrap();

        history.delete_user("alice").await.unwrap();

        assert!(history.load("a-1").await.unwrap().is_none());
        assert!(history.load("b-1").await.unwrap().is_some());
        assert_eq!(history.list("bob").await.unwrap().len(), 1);
    }
}
