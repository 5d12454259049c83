pub mod message;
pub mod prompt;
pub mod store;

pub use message::{Message, Role};
pub use prompt::{DEFAULT_SYSTEM_PROMPT, SystemPromptManager};
pub use store::{
    Conversation, ConversationStore, DEFAULT_CONVERSATION_ID, DEFAULT_USER_ID, StoreError,
};
