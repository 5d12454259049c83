use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::tool::{Tool, ToolError, require_str};

const PISTON_ENDPOINT: &str = "https://emkc.org/api/v2/piston/execute";

/// Remote code execution via the public Piston API.
pub struct CodeExecutorTool {
    http: Client,
}

impl CodeExecutorTool {
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    fn fail(&self, reason: impl ToString) -> ToolError {
        ToolError::ExecutionFailed {
            tool: self.name().to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl Tool for CodeExecutorTool {
    fn name(&self) -> &str {
        "code_executor"
    }

    fn description(&self) -> &str {
        "Execute a code snippet in the given language on a remote sandbox and \
         return its output. Use when the user asks to run or evaluate code."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "language": {
                    "type": "string",
                    "description": "Language name, e.g. 'python' or 'javascript'"
                },
                "code": {
                    "type": "string",
                    "description": "The source code to run"
                }
            },
            "required": ["language", "code"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let language = require_str(self.name(), &args, "language")?;
        let code = require_str(self.name(), &args, "code")?;

        let result: Value = self
            .http
            .post(PISTON_ENDPOINT)
            .json(&serde_json::json!({
                "language": language,
                "version": "*",
                "files": [{"content": code}],
            }))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| self.fail(e))?
            .json()
            .await
            .map_err(|e| self.fail(e))?;

        let output = result
            .pointer("/run/output")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if output.is_empty() {
            Ok("(no output)".to_string())
        } else {
            Ok(output.to_string())
        }
    }
}
