use std::sync::Arc;

use tracing::debug;

use crate::config::{Config, DEFAULT_FALLBACK_PARSE_MAX_LEN, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use crate::conversation::{
    Conversation, ConversationStore, DEFAULT_CONVERSATION_ID, DEFAULT_USER_ID, Message,
};
use crate::llm::{CompletionClient, CompletionRequest, LlmError, ToolChoice};
use crate::tool::builtin::QR_TOOL_NAME;
use crate::tool::{ToolError, ToolExecutor, ToolRegistry, parse_tool_calls};

/// Tuning for the chat turn loop.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// The model to use
    pub model: String,
    /// Sampling temperature for the tool-selecting completion
    pub temperature: f32,
    /// Replies at least this long are never fallback-parsed
    pub fallback_parse_max_len: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            fallback_parse_max_len: DEFAULT_FALLBACK_PARSE_MAX_LEN,
        }
    }
}

impl From<&Config> for AgentConfig {
    fn from(config: &Config) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            fallback_parse_max_len: config.fallback_parse_max_len,
        }
    }
}

/// A failure that aborts the turn. Its `Display` is the user-visible
/// answer text; nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    /// A completion call failed
    #[error(transparent)]
    Completion(#[from] LlmError),
    /// Tool dispatch or execution failed
    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// Drives one chat turn: user message in, assistant answer out, with at
/// most one round of tool calls in between.
#[derive(Clone)]
pub struct Agent {
    store: Arc<ConversationStore>,
    llm: Arc<dyn CompletionClient>,
    executor: ToolExecutor,
    config: AgentConfig,
}

impl Agent {
    /// Creates an agent over the given store, completion client, and tools.
    pub fn new(
        store: Arc<ConversationStore>,
        llm: Arc<dyn CompletionClient>,
        registry: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Self {
        Self {
            store,
            llm,
            executor: ToolExecutor::new(registry),
            config,
        }
    }

    /// Runs one turn and returns the assistant's answer.
    ///
    /// `conversation_id` and `user_id` default to `"default"` when absent;
    /// callers without explicit ids therefore share one conversation.
    /// This method never fails: every turn-aborting error becomes the
    /// answer text and is appended to the transcript, so history stays
    /// consistent with what the user saw.
    pub async fn chat(
        &self,
        message: &str,
        conversation_id: Option<&str>,
        user_id: Option<&str>,
    ) -> String {
        let conversation_id = conversation_id.unwrap_or(DEFAULT_CONVERSATION_ID);
        let user_id = user_id.unwrap_or(DEFAULT_USER_ID);

        let handle = self.store.get_or_create(user_id, conversation_id).await;
        let answer = {
            // Holding the conversation lock for the whole turn serializes
            // concurrent requests on the same id.
            let mut conversation = handle.lock().await;
            conversation.push(Message::user(message));

            match self.run_turn(&mut conversation).await {
                Ok(answer) => answer,
                Err(err) => {
                    let answer = err.to_string();
                    conversation.push(Message::assistant(answer.clone()));
                    answer
                }
            }
        };

        self.store.persist(conversation_id).await;
        answer
    }

    async fn run_turn(&self, conversation: &mut Conversation) -> Result<String, TurnError> {
        let first = self
            .llm
            .complete(CompletionRequest {
                model: self.config.model.clone(),
                messages: conversation.messages.clone(),
                tools: self.executor.definitions(),
                tool_choice: Some(ToolChoice::Auto),
                temperature: Some(self.config.temperature),
            })
            .await?;
        debug!(
            prompt_tokens = first.usage.prompt_tokens,
            completion_tokens = first.usage.completion_tokens,
            calls = first.tool_calls.len(),
            "First completion"
        );

        let mut calls = first.tool_calls;
        let text = first.content.unwrap_or_default();

        // A short reply with no structured calls may be a disguised call;
        // long free text is never reparsed, whatever it contains.
        if calls.is_empty() && text.len() < self.config.fallback_parse_max_len {
            if let Some(recovered) = parse_tool_calls(&text) {
                debug!(name = %recovered[0].name, "Recovered pseudo tool call from reply text");
                calls = recovered;
            }
        }

        if calls.is_empty() {
            conversation.push(Message::assistant(text.clone()));
            return Ok(text);
        }

        // One tool message per call, in the order issued. The first
        // failure aborts the turn; nothing is skipped over.
        let mut qr_payload: Option<String> = None;
        for call in &calls {
            let output = self.executor.execute(call).await?;
            let content = if call.name == QR_TOOL_NAME {
                qr_payload = Some(output.clone());
                format!("data:image/png;base64,{output}")
            } else {
                output
            };
            conversation.push(Message::tool(content, &call.id, &call.name));
        }

        // Plain follow-up completion: the model synthesizes an answer from
        // the tool output now in context, with no tools offered, so a turn
        // never recurses into a second round.
        let second = self
            .llm
            .complete(CompletionRequest::plain(
                self.config.model.clone(),
                conversation.messages.clone(),
            ))
            .await?;
        debug!(
            prompt_tokens = second.usage.prompt_tokens,
            completion_tokens = second.usage.completion_tokens,
            "Final completion"
        );

        let mut answer = second.content.unwrap_or_default();
        // The tool message itself is never rendered, so a generated QR
        // image is surfaced by attaching it to the visible answer.
        if let Some(payload) = qr_payload {
            answer.push_str(&format!(
                "\n\n<img src='data:image/png;base64,{payload}' alt='QR Code' class='rounded mt-3 h-[300px] w-[300px]' />"
            ));
        }
        conversation.push(Message::assistant(answer.clone()));
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use mockall::Sequence;
    use serde_json::Value;

    use crate::conversation::{Role, SystemPromptManager};
    use crate::history::MemoryHistory;
    use crate::llm::client::MockCompletionClient;
    use crate::llm::{CompletionResponse, FinishReason, Usage};
    use crate::tool::{DynTool, Tool, ToolCall};

    fn text_response(text: &str) -> CompletionResponse {
        CompletionResponse {
            content: Some(text.to_string()),
            tool_calls: Vec::new(),
            finish_reason: FinishReason::Stop,
            usage: Usage::default(),
        }
    }

    fn call_response(calls: Vec<ToolCall>) -> CompletionResponse {
        CompletionResponse {
            content: None,
            tool_calls: calls,
            finish_reason: FinishReason::ToolCalls,
            usage: Usage::default(),
        }
    }

    fn call(id: &str, name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    struct StaticTool {
        name: &'static str,
        output: &'static str,
        executions: Arc<AtomicUsize>,
    }

    impl StaticTool {
        fn new(name: &'static str, output: &'static str) -> (Arc<Self>, Arc<AtomicUsize>) {
            let executions = Arc::new(AtomicUsize::new(0));
            let tool = Arc::new(Self {
                name,
                output,
                executions: executions.clone(),
            });
            (tool, executions)
        }
    }

    #[async_trait]
    impl Tool for StaticTool {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "test tool"
        }
        fn parameters_schema(&self) -> Value {
            serde_json::json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, _args: Value) -> Result<String, ToolError> {
            self.executions.fetch_add(1, Ordering::SeqCst);
            Ok(self.output.to_string())
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "broken"
        }
        fn description(&self) -> &str {
            "always fails"
        }
        fn parameters_schema(&self) -> Value {
            serde_json::json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, _args: Value) -> Result<String, ToolError> {
            Err(ToolError::ExecutionFailed {
                tool: "broken".to_string(),
                reason: "upstream down".to_string(),
            })
        }
    }

    fn agent_with(mock: MockCompletionClient, tools: Vec<DynTool>) -> (Agent, Arc<ConversationStore>) {
        let mut registry = ToolRegistry::new();
        for tool in tools {
            registry.register(tool);
        }
        let store = Arc::new(ConversationStore::new(
            Arc::new(SystemPromptManager::new()),
            Arc::new(MemoryHistory::new()),
        ));
        let agent = Agent::new(
            store.clone(),
            Arc::new(mock),
            Arc::new(registry),
            AgentConfig::default(),
        );
        (agent, store)
    }

    #[tokio::test]
    async fn direct_answer_is_appended_verbatim() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete()
            .times(1)
            .withf(|req| !req.tools.is_empty() && req.tool_choice == Some(ToolChoice::Auto))
            .returning(|_| Ok(text_response("Hello there!")));

        let (tool, _) = StaticTool::new("echo", "unused");
        let (agent, store) = agent_with(mock, vec![tool]);

        let answer = agent.chat("hi", Some("c1"), None).await;
        assert_eq!(answer, "Hello there!");

        let messages = store.snapshot("c1").await.unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "hi");
        assert_eq!(messages[2].content, "Hello there!");
    }

    #[tokio::test]
    async fn structured_search_call_round_trips_through_the_tools() {
        // The end-to-end shape: search call, tool message, synthesized answer.
        let mut seq = Sequence::new();
        let mut mock = MockCompletionClient::new();
        mock.expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(call_response(vec![call(
                    "call_1",
                    "search_links",
                    r#"{"query": "weather Paris"}"#,
                )]))
            });
        mock.expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|req| {
                // Plain follow-up: no tools offered, tool output in context.
                req.tools.is_empty()
                    && req.tool_choice.is_none()
                    && req.messages.iter().any(|m| m.role == Role::Tool)
            })
            .returning(|_| Ok(text_response("Try meteofrance.com for Paris weather.")));

        let (search, executions) = StaticTool::new("search_links", "Title: Météo-France\nURL: x");
        let (agent, store) = agent_with(mock, vec![search]);

        let answer = agent
            .chat("What's the weather site for Paris?", Some("c1"), None)
            .await;
        assert_eq!(answer, "Try meteofrance.com for Paris weather.");
        assert_eq!(executions.load(Ordering::SeqCst), 1);

        let messages = store.snapshot("c1").await.unwrap();
        let tool_msg = &messages[2];
        assert_eq!(tool_msg.role, Role::Tool);
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(tool_msg.name.as_deref(), Some("search_links"));
        // No QR ran, so no image suffix.
        assert!(!answer.contains("<img"));
    }

    #[tokio::test]
    async fn two_calls_yield_two_tool_messages_before_the_answer() {
        let mut seq = Sequence::new();
        let mut mock = MockCompletionClient::new();
        mock.expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(call_response(vec![
                    call("call_a", "first", "{}"),
                    call("call_b", "second", "{}"),
                ]))
            });
        mock.expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(text_response("done")));

        let (first, _) = StaticTool::new("first", "one");
        let (second, _) = StaticTool::new("second", "two");
        let (agent, store) = agent_with(mock, vec![first, second]);

        agent.chat("go", Some("c1"), None).await;

        let messages = store.snapshot("c1").await.unwrap();
        // system, user, tool, tool, assistant
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[2].tool_call_id.as_deref(), Some("call_a"));
        assert_eq!(messages[3].tool_call_id.as_deref(), Some("call_b"));
        assert_eq!(messages[4].role, Role::Assistant);
    }

    #[tokio::test]
    async fn qr_payload_is_wrapped_and_the_answer_carries_the_image() {
        let mut seq = Sequence::new();
        let mut mock = MockCompletionClient::new();
        mock.expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(call_response(vec![call(
                    "call_qr",
                    QR_TOOL_NAME,
                    r#"{"data": "hello"}"#,
                )]))
            });
        mock.expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(text_response("Here is your QR code.")));

        let (qr, _) = StaticTool::new(QR_TOOL_NAME, "QVFJPQ==");
        let (agent, store) = agent_with(mock, vec![qr]);

        let answer = agent.chat("qr for hello", Some("c1"), None).await;

        let messages = store.snapshot("c1").await.unwrap();
        assert_eq!(messages[2].content, "data:image/png;base64,QVFJPQ==");
        assert!(answer.ends_with(
            "<img src='data:image/png;base64,QVFJPQ==' alt='QR Code' class='rounded mt-3 h-[300px] w-[300px]' />"
        ));
        assert_eq!(answer.matches("<img").count(), 1);
    }

    #[tokio::test]
    async fn short_pseudo_call_reply_is_recovered_and_discarded() {
        let mut seq = Sequence::new();
        let mut mock = MockCompletionClient::new();
        mock.expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(text_response(r#"<function=echo{"text": "hi"}</function>"#)));
        mock.expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(text_response("echoed for you")));

        let (echo, executions) = StaticTool::new("echo", "hi");
        let (agent, store) = agent_with(mock, vec![echo]);

        let answer = agent.chat("say hi", Some("c1"), None).await;
        assert_eq!(answer, "echoed for you");
        assert_eq!(executions.load(Ordering::SeqCst), 1);

        // The disguised-call text never lands in the transcript.
        let messages = store.snapshot("c1").await.unwrap();
        assert!(messages.iter().all(|m| !m.content.contains("<function=")));
        assert_eq!(messages[2].tool_call_id.as_deref(), Some("call_echo"));
    }

    #[tokio::test]
    async fn long_prose_containing_the_sentinel_is_a_direct_answer() {
        let prose = format!(
            "The pseudo-call syntax looks like <function=echo{{\"text\": \"hi\"}}</function> {}",
            "and here is a long explanation of why that matters for parsing."
        );
        assert!(prose.len() >= DEFAULT_FALLBACK_PARSE_MAX_LEN);

        let reply = prose.clone();
        let mut mock = MockCompletionClient::new();
        mock.expect_complete()
            .times(1)
            .returning(move |_| Ok(text_response(&reply)));

        let (echo, executions) = StaticTool::new("echo", "hi");
        let (agent, _) = agent_with(mock, vec![echo]);

        let answer = agent.chat("explain", Some("c1"), None).await;
        assert_eq!(answer, prose);
        assert_eq!(executions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn completion_failure_becomes_the_answer_and_is_recorded() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete()
            .times(1)
            .returning(|_| Err(LlmError::Api("503: overloaded".to_string())));

        let (agent, store) = agent_with(mock, vec![]);

        let answer = agent.chat("hi", Some("c1"), None).await;
        assert_eq!(answer, "API error: 503: overloaded");

        let messages = store.snapshot("c1").await.unwrap();
        let last = messages.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, answer);
    }

    #[tokio::test]
    async fn unknown_tool_aborts_instead_of_guessing() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete()
            .times(1)
            .returning(|_| Ok(call_response(vec![call("call_1", "no_such_tool", "{}")])));

        let (agent, _) = agent_with(mock, vec![]);

        let answer = agent.chat("hi", Some("c1"), None).await;
        assert_eq!(answer, "Tool not found: no_such_tool");
    }

    #[tokio::test]
    async fn first_tool_failure_skips_the_rest_of_the_batch() {
        let mut mock = MockCompletionClient::new();
        // Only one completion: the failure aborts before the follow-up.
        mock.expect_complete()
            .times(1)
            .returning(|_| {
                Ok(call_response(vec![
                    call("call_a", "broken", "{}"),
                    call("call_b", "after", "{}"),
                ]))
            });

        let (after, executions) = StaticTool::new("after", "unused");
        let (agent, _) = agent_with(mock, vec![Arc::new(FailingTool), after]);

        let answer = agent.chat("go", Some("c1"), None).await;
        assert_eq!(answer, "Tool broken execution failed: upstream down");
        assert_eq!(executions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_conversation_id_falls_back_to_the_shared_default() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete()
            .times(1)
            .returning(|_| Ok(text_response("ok")));

        let (agent, store) = agent_with(mock, vec![]);

        agent.chat("hi", None, None).await;
        assert!(store.snapshot(DEFAULT_CONVERSATION_ID).await.is_some());
    }
}
