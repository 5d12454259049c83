use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{Message, Role, SystemPromptManager};
use crate::history::ConversationHistory;

/// Conversation id used when the caller supplies none.
pub const DEFAULT_CONVERSATION_ID: &str = "default";
/// User id used when the caller supplies none.
pub const DEFAULT_USER_ID: &str = "default";

/// An ordered, append-only transcript for one conversation id.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Seeds a brand-new conversation with its system message.
    fn new(id: &str, user_id: &str, system_prompt: String) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            user_id: user_id.to_string(),
            messages: vec![Message::system(system_prompt)],
            created_at: now,
            updated_at: now,
        }
    }

    /// Rehydrates a conversation from its persisted transcript.
    fn from_history(id: &str, user_id: &str, messages: Vec<Message>) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            user_id: user_id.to_string(),
            messages,
            created_at: now,
            updated_at: now,
        }
    }

    /// Appends a message, keeping chronological order.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.updated_at = Utc::now();
    }

    /// Index of the k-th (1-based) user message, if present.
    fn user_turn_start(&self, user_turn_index: usize) -> Option<usize> {
        let mut seen = 0;
        for (i, msg) in self.messages.iter().enumerate() {
            if msg.role == Role::User {
                seen += 1;
                if seen == user_turn_index {
                    return Some(i);
                }
            }
        }
        None
    }
}

/// Errors from store operations driven by caller input.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no user turn at index {0}")]
    InvalidTurnIndex(usize),
    #[error("conversation not found: {0}")]
    NotFound(String),
}

/// Owns every live conversation, keyed by id.
///
/// Each conversation sits behind its own mutex so concurrent turns on the
/// same id serialize instead of interleaving appends. Durable mirroring
/// goes through the injected [`ConversationHistory`]; its failures are
/// logged and never propagate.
pub struct ConversationStore {
    conversations: Mutex<HashMap<String, Arc<Mutex<Conversation>>>>,
    prompts: Arc<SystemPromptManager>,
    history: Arc<dyn ConversationHistory>,
}

impl ConversationStore {
    pub fn new(prompts: Arc<SystemPromptManager>, history: Arc<dyn ConversationHistory>) -> Self {
        Self {
            conversations: Mutex::new(HashMap::new()),
            prompts,
            history,
        }
    }

    /// Returns the conversation for an id, creating it on first access.
    ///
    /// A cache miss first consults the durable store; only a conversation
    /// unknown there is seeded fresh, with the system prompt the user has
    /// configured *at this moment*. Later prompt changes do not touch it.
    pub async fn get_or_create(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> Arc<Mutex<Conversation>> {
        if let Some(conv) = self.conversations.lock().await.get(conversation_id) {
            return conv.clone();
        }

        // Seeding happens outside the map lock; the load may hit the network.
        let conversation = match self.history.load(conversation_id).await {
            Ok(Some(messages)) => {
                debug!(conversation_id, "Rehydrating conversation from history");
                Conversation::from_history(conversation_id, user_id, messages)
            }
            Ok(None) => {
                let prompt = self.prompts.get(user_id).await;
                Conversation::new(conversation_id, user_id, prompt)
            }
            Err(err) => {
                warn!(conversation_id, %err, "History load failed, seeding fresh");
                let prompt = self.prompts.get(user_id).await;
                Conversation::new(conversation_id, user_id, prompt)
            }
        };

        let mut map = self.conversations.lock().await;
        map.entry(conversation_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(conversation)))
            .clone()
    }

    /// Copies out a conversation's transcript, if it is live.
    pub async fn snapshot(&self, conversation_id: &str) -> Option<Vec<Message>> {
        let conv = self.conversations.lock().await.get(conversation_id)?.clone();
        let conv = conv.lock().await;
        Some(conv.messages.clone())
    }

    /// Mirrors a conversation to the durable store, best-effort.
    pub async fn persist(&self, conversation_id: &str) {
        let Some(conv) = self.conversations.lock().await.get(conversation_id).cloned() else {
            return;
        };
        let (user_id, messages) = {
            let conv = conv.lock().await;
            (conv.user_id.clone(), conv.messages.clone())
        };
        if let Err(err) = self.history.save(&user_id, conversation_id, &messages).await {
            warn!(conversation_id, %err, "Failed to persist conversation");
        }
    }

    /// Removes the k-th (1-based) user message and everything after it.
    ///
    /// The seed system message always survives; the surviving prefix is
    /// exactly the messages strictly before the k-th user message. A
    /// conversation known to neither memory nor the durable store is an
    /// error, not an implicit creation.
    pub async fn truncate(
        &self,
        user_id: &str,
        conversation_id: &str,
        user_turn_index: usize,
    ) -> Result<(), StoreError> {
        let live = self.conversations.lock().await.get(conversation_id).cloned();
        let conv = match live {
            Some(conv) => conv,
            None => match self.history.load(conversation_id).await {
                Ok(Some(messages)) => {
                    let rebuilt = Conversation::from_history(conversation_id, user_id, messages);
                    let mut map = self.conversations.lock().await;
                    map.entry(conversation_id.to_string())
                        .or_insert_with(|| Arc::new(Mutex::new(rebuilt)))
                        .clone()
                }
                _ => return Err(StoreError::NotFound(conversation_id.to_string())),
            },
        };
        {
            let mut conv = conv.lock().await;
            let cut = conv
                .user_turn_start(user_turn_index)
                .ok_or(StoreError::InvalidTurnIndex(user_turn_index))?;
            conv.messages.truncate(cut);
            conv.updated_at = Utc::now();
        }
        self.persist(conversation_id).await;
        Ok(())
    }

    /// Drops one conversation from memory and the durable store.
    pub async fn clear(&self, conversation_id: &str) {
        self.conversations.lock().await.remove(conversation_id);
        if let Err(err) = self.history.delete(conversation_id).await {
            warn!(conversation_id, %err, "Failed to delete conversation from history");
        }
    }

    /// Drops every conversation belonging to a user.
    pub async fn clear_user(&self, user_id: &str) {
        let mut map = self.conversations.lock().await;
        let mut keep = HashMap::new();
        for (id, conv) in map.drain() {
            if conv.lock().await.user_id != user_id {
                keep.insert(id, conv);
            }
        }
        *map = keep;
        drop(map);
        if let Err(err) = self.history.delete_user(user_id).await {
            warn!(user_id, %err, "Failed to delete user history");
        }
    }

    /// Drops every conversation in the store.
    pub async fn clear_all(&self) {
        self.conversations.lock().await.clear();
    }

    /// The user's stored conversations, from the durable store.
    pub async fn list_saved(&self, user_id: &str) -> Vec<crate::history::StoredConversation> {
        match self.history.list(user_id).await {
            Ok(rows) => rows,
            Err(err) => {
                warn!(user_id, %err, "Failed to list history");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryHistory;

    fn store() -> ConversationStore {
        ConversationStore::new(
            Arc::new(SystemPromptManager::new()),
            Arc::new(MemoryHistory::new()),
        )
    }

    #[tokio::test]
    async fn first_message_is_the_system_seed() {
        let store = store();
        let conv = store.get_or_create("alice", "c1").await;
        let conv = conv.lock().await;
        assert_eq!(conv.messages.len(), 1);
        assert_eq!(conv.messages[0].role, Role::System);
        assert_eq!(conv.messages[0].content, super::super::DEFAULT_SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn seeding_reads_the_prompt_at_creation_time() {
        let prompts = Arc::new(SystemPromptManager::new());
        let store = ConversationStore::new(prompts.clone(), Arc::new(MemoryHistory::new()));

        prompts.set("alice", "Prompt A").await;
        let conv = store.get_or_create("alice", "c1").await;
        assert_eq!(conv.lock().await.messages[0].content, "Prompt A");

        // An existing conversation keeps its seed; only new ones see the change.
        prompts.set("alice", "Prompt B").await;
        let again = store.get_or_create("alice", "c1").await;
        assert_eq!(again.lock().await.messages[0].content, "Prompt A");
        let fresh = store.get_or_create("alice", "c2").await;
        assert_eq!(fresh.lock().await.messages[0].content, "Prompt B");
    }

    #[tokio::test]
    async fn cache_miss_consults_the_durable_store() {
        let history = Arc::new(MemoryHistory::new());
        let saved = vec![Message::system("seed"), Message::user("hello")];
        history.save("alice", "c1", &saved).await.unwrap();

        let store = ConversationStore::new(Arc::new(SystemPromptManager::new()), history);
        let conv = store.get_or_create("alice", "c1").await;
        assert_eq!(conv.lock().await.messages.len(), 2);
    }

    #[tokio::test]
    async fn truncate_cuts_from_the_kth_user_message() {
        let store = store();
        let conv = store.get_or_create("alice", "c1").await;
        {
            let mut conv = conv.lock().await;
            conv.push(Message::user("turn one"));
            conv.push(Message::assistant("reply one"));
            conv.push(Message::user("turn two"));
            conv.push(Message::assistant("reply two"));
            conv.push(Message::user("turn three"));
            conv.push(Message::assistant("reply three"));
        }

        store.truncate("alice", "c1", 2).await.unwrap();

        let messages = store.snapshot("c1").await.unwrap();
        // system seed, first user turn, first reply
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "turn one");
        assert_eq!(messages[2].content, "reply one");
    }

    #[tokio::test]
    async fn truncate_rejects_an_out_of_range_index() {
        let store = store();
        let conv = store.get_or_create("alice", "c1").await;
        conv.lock().await.push(Message::user("only turn"));

        let err = store.truncate("alice", "c1", 5).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidTurnIndex(5)));
    }

    #[tokio::test]
    async fn clear_all_empties_the_store() {
        let store = store();
        store.get_or_create("alice", "a1").await;
        store.get_or_create("bob", "b1").await;

        store.clear_all().await;

        assert!(store.snapshot("a1").await.is_none());
        assert!(store.snapshot("b1").await.is_none());
    }

    #[tokio::test]
    async fn truncate_unknown_conversation_is_not_found() {
        let store = store();
        let err = store.truncate("alice", "ghost", 1).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn clear_user_leaves_other_users_alone() {
        let store = store();
        store.get_or_create("alice", "a1").await;
        store.get_or_create("bob", "b1").await;

        store.clear_user("alice").await;

        assert!(store.snapshot("a1").await.is_none());
        assert!(store.snapshot("b1").await.is_some());
    }
}
