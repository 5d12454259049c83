use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde_json::Value;

use crate::tool::{Tool, ToolError, require_str};

/// Name the orchestrator matches on for the data-URI special case.
pub const QR_TOOL_NAME: &str = "generate_qr_code";

const QR_ENDPOINT: &str = "https://api.qrserver.com/v1/create-qr-code/";

/// QR-code generation via the qrserver API.
///
/// Returns the raw base64 PNG payload; wrapping it as a data URI is the
/// orchestrator's job, so the handler stays a plain string producer like
/// every other tool.
pub struct QrCodeTool {
    http: Client,
}

impl QrCodeTool {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Tool for QrCodeTool {
    fn name(&self) -> &str {
        QR_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Generate a QR code image for the given text or URL and return it as a base64 string."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "data": {
                    "type": "string",
                    "description": "The text or URL to encode in the QR code"
                }
            },
            "required": ["data"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let data = require_str(self.name(), &args, "data")?;

        let png = self
            .http
            .get(QR_ENDPOINT)
            .query(&[("size", "300x300"), ("data", data)])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ToolError::ExecutionFailed {
                tool: self.name().to_string(),
                reason: e.to_string(),
            })?
            .bytes()
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool: self.name().to_string(),
                reason: e.to_string(),
            })?;

        Ok(STANDARD.encode(&png))
    }
}
