use std::collections::HashMap;
use tokio::sync::RwLock;

/// The persona used whenever a user has not set their own prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Luna, an AI assistant built by Abhishek. \
     You have realtime access to the internet and can help with a variety of tasks. \
     Use only one tool at a time";

/// Per-user system prompt storage.
///
/// Conversations read the prompt once, at creation time; changing a user's
/// prompt affects only conversations seeded afterward.
#[derive(Debug, Default)]
pub struct SystemPromptManager {
    prompts: RwLock<HashMap<String, String>>,
}

impl SystemPromptManager {
    /// Creates a manager with no per-user overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the active prompt for a user.
    pub async fn get(&self, user_id: &str) -> String {
        self.prompts
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string())
    }

    /// Sets a user's prompt. A blank value resets to the default.
    pub async fn set(&self, user_id: &str, value: &str) {
        let mut prompts = self.prompts.write().await;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            prompts.remove(user_id);
        } else {
            prompts.insert(user_id.to_string(), trimmed.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unset_user_gets_default() {
        let prompts = SystemPromptManager::new();
        assert_eq!(prompts.get("alice").await, DEFAULT_SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn get_is_idempotent() {
        let prompts = SystemPromptManager::new();
        prompts.set("alice", "You are a pirate.").await;
        assert_eq!(prompts.get("alice").await, prompts.get("alice").await);
    }

    #[tokio::test]
    async fn set_scopes_to_the_user() {
        let prompts = SystemPromptManager::new();
        prompts.set("alice", "You are a pirate.").await;
        assert_eq!(prompts.get("alice").await, "You are a pirate.");
        assert_eq!(prompts.get("bob").await, DEFAULT_SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn blank_set_resets_to_default() {
        let prompts = SystemPromptManager::new();
        prompts.set("alice", "You are a pirate.").await;
        prompts.set("alice", "   ").await;
        assert_eq!(prompts.get("alice").await, DEFAULT_SYSTEM_PROMPT);
    }
}
