pub mod builtin;
pub mod executor;
pub mod parser;
pub mod registry;

pub use executor::ToolExecutor;
pub use parser::parse_tool_calls;
pub use registry::ToolRegistry;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Definition of a tool, as offered to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name
    pub name: String,
    /// Natural-language description shown to the model
    pub description: String,
    /// JSON Schema for the tool's named arguments
    pub parameters: Value,
}

/// A request from the model to invoke a named tool.
///
/// Request-scoped: consumed within one turn, never persisted. `arguments`
/// stays as the raw JSON object text from the wire so a malformed payload
/// fails at dispatch time, with the decode error the turn reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// Errors from tool dispatch and execution. Any of these aborts the turn.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The model asked for a tool that is not registered
    #[error("Tool not found: {0}")]
    NotFound(String),
    /// The argument payload was not a JSON object
    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
    /// The handler itself failed
    #[error("Tool {tool} execution failed: {reason}")]
    ExecutionFailed { tool: String, reason: String },
}

/// A named external capability the model may invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name, the dispatch key.
    fn name(&self) -> &str;
    /// What the tool does, shown to the model.
    fn description(&self) -> &str;
    /// JSON Schema for the tool's named arguments.
    fn parameters_schema(&self) -> Value;

    /// Runs the tool with decoded arguments, returning its text result.
    async fn execute(&self, args: Value) -> Result<String, ToolError>;

    /// The definition offered to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A shared dynamic tool reference.
pub type DynTool = Arc<dyn Tool>;

/// Extracts a required string argument, with the error naming the tool.
pub(crate) fn require_str<'a>(tool: &str, args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArguments {
            tool: tool.to_string(),
            reason: format!("{key} is required"),
        })
}
