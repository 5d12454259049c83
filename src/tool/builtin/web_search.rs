use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::config::GoogleSearchConfig;
use crate::tool::{Tool, ToolError, require_str};

pub(crate) const SEARCH_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// Web search over Google Custom Search: titled links with snippets.
pub struct WebSearchTool {
    http: Client,
    credentials: Option<GoogleSearchConfig>,
}

impl WebSearchTool {
    pub fn new(http: Client, credentials: Option<GoogleSearchConfig>) -> Self {
        Self { http, credentials }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Perform a web search and return the top results as titled links with descriptions. \
         Use for current events, prices, or anything needing up-to-date information."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let query = require_str(self.name(), &args, "query")?;
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            ToolError::ExecutionFailed {
                tool: self.name().to_string(),
                reason: "web search is not configured".to_string(),
            }
        })?;

        let data: Value = self
            .http
            .get(SEARCH_ENDPOINT)
            .query(&[
                ("key", credentials.api_key.as_str()),
                ("cx", credentials.engine_id.as_str()),
                ("q", query),
            ])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ToolError::ExecutionFailed {
                tool: self.name().to_string(),
                reason: e.to_string(),
            })?
            .json()
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool: self.name().to_string(),
                reason: e.to_string(),
            })?;

        Ok(format_results(&data))
    }
}

/// Formats a Custom Search response into the titled-link listing.
pub(crate) fn format_results(data: &Value) -> String {
    let Some(items) = data.get("items").and_then(Value::as_array) else {
        return "No results found.".to_string();
    };

    let mut output = String::new();
    for item in items {
        let title = item.get("title").and_then(Value::as_str).unwrap_or("");
        let link = item.get("link").and_then(Value::as_str).unwrap_or("");
        let snippet = item.get("snippet").and_then(Value::as_str).unwrap_or("");
        output.push_str(&format!(
            "Title: {title}\nURL: {link}\nDescription: {snippet}\n\n"
        ));
    }
    output
}
