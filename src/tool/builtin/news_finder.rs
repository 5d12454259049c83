use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::read_website::{extract_paragraphs, fetch_page};
use super::web_search::SEARCH_ENDPOINT;
use crate::config::GoogleSearchConfig;
use crate::tool::{Tool, ToolError, require_str};

// Per-page excerpt cap; headlines plus a lead are enough for the model.
const EXCERPT_LIMIT: usize = 500;
const MAX_SOURCES: usize = 6;

/// News lookup: search for recent coverage, then pull a short excerpt
/// from each source page.
pub struct NewsFinderTool {
    http: Client,
    credentials: Option<GoogleSearchConfig>,
}

impl NewsFinderTool {
    pub fn new(http: Client, credentials: Option<GoogleSearchConfig>) -> Self {
        Self { http, credentials }
    }
}

#[async_trait]
impl Tool for NewsFinderTool {
    fn name(&self) -> &str {
        "news_finder"
    }

    fn description(&self) -> &str {
        "Find recent news coverage for a query and return short excerpts from \
         each source. Use for breaking news and current events."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The news topic to look up"
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
                reason: "news search is not configured".to_string(),
            }
        })?;

        let data: Value = self
            .http
            .get(SEARCH_ENDPOINT)
            .query(&[
                ("key", credentials.api_key.as_str()),
                ("cx", credentials.engine_id.as_str()),
                ("q", query),
                ("num", "6"),
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

        let Some(items) = data.get("items").and_then(Value::as_array) else {
            return Ok("No news found.".to_string());
        };

        let mut output = String::new();
        for item in items.iter().take(MAX_SOURCES) {
            let Some(link) = item.get("link").and_then(Value::as_str) else {
                continue;
            };
            let title = item.get("title").and_then(Value::as_str).unwrap_or(link);

            // A page that fails to load just drops out of the digest.
            let excerpt = match fetch_page(&self.http, self.name(), link).await {
                Ok(html) => {
                    let mut text = extract_paragraphs(&html);
                    if text.len() > EXCERPT_LIMIT {
                        let mut end = EXCERPT_LIMIT;
                        while end > 0 && !text.is_char_boundary(end) {
                            end -= 1;
                        }
                        text.truncate(end);
                    }
                    text
                }
                Err(_) => String::new(),
            };

            if !excerpt.is_empty() {
                output.push_str(&format!("Source: [{title}]({link})\n{excerpt}\n\n"));
            }
        }

        if output.is_empty() {
            output = "No readable news sources found.".to_string();
        }
        Ok(output)
    }
}
