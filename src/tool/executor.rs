use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::tool::{ToolCall, ToolError, ToolRegistry};

/// Resolves and runs tool calls against a registry.
///
/// Dispatch is strict: an unregistered name, a non-object argument
/// payload, or a handler failure is returned as the error that aborts the
/// turn. Calls are never silently skipped.
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
}

impl ToolExecutor {
    /// Creates an executor over the given registry.
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// The registry's definitions, for offering to the model.
    pub fn definitions(&self) -> Vec<crate::tool::ToolDefinition> {
        self.registry.definitions()
    }

    /// Executes one call and returns the handler's text result.
    pub async fn execute(&self, call: &ToolCall) -> Result<String, ToolError> {
        let tool = self
            .registry
            .get(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?
            .clone();

        let args: Value = serde_json::from_str(&call.arguments).map_err(|e| {
            ToolError::InvalidArguments {
                tool: call.name.clone(),
                reason: e.to_string(),
            }
        })?;
        if !args.is_object() {
            return Err(ToolError::InvalidArguments {
                tool: call.name.clone(),
                reason: "argument payload is not a JSON object".to_string(),
            });
        }

        debug!(tool = %call.name, id = %call.id, "Executing tool call");
        tool.execute(args).await
    }
}
