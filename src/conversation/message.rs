use serde::{Deserialize, Serialize};

/// The author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The seeded instruction message
    System,
    /// End-user input
    User,
    /// A model reply
    Assistant,
    /// A tool invocation result
    Tool,
}

/// One entry in a conversation transcript.
///
/// The serialized form is the OpenAI chat-completions wire shape, so the
/// same value is stored, persisted, and sent to the completion API without
/// translation. `tool_call_id` and `name` are only present on `Tool`
/// messages, where they tie the result back to the call that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message author
    pub role: Role,
    /// The message text
    pub content: String,
    /// For tool messages, the id of the call this answers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// For tool messages, the name of the tool that ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_call_id: None,
            name: None,
        }
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_call_id: None,
            name: None,
        }
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_call_id: None,
            name: None,
        }
    }

    /// Creates a tool result message answering the given call.
    pub fn tool(
        content: impl Into<String>,
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_call_id: Some(tool_call_id.into()),
            name: Some(name.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_message_carries_call_id_and_name() {
        let msg = Message::tool("result text", "call_abc", "web_search");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_abc"));
        assert_eq!(msg.name.as_deref(), Some("web_search"));
    }

    #[test]
    fn optional_fields_are_skipped_on_the_wire() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));

        let json = serde_json::to_value(Message::tool("out", "call_1", "web_search")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "role": "tool",
                "content": "out",
                "tool_call_id": "call_1",
                "name": "web_search"
            })
        );
    }
}
