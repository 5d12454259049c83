use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::web_search::SEARCH_ENDPOINT;
use crate::config::GoogleSearchConfig;
use crate::tool::{Tool, ToolError, require_str};

/// Image search over Google Custom Search, emitting inline `<img>` tags
/// the chat page can render directly.
pub struct ImageSearchTool {
    http: Client,
    credentials: Option<GoogleSearchConfig>,
}

impl ImageSearchTool {
    pub fn new(http: Client, credentials: Option<GoogleSearchConfig>) -> Self {
        Self { http, credentials }
    }
}

#[async_trait]
impl Tool for ImageSearchTool {
    fn name(&self) -> &str {
        "image_search"
    }

    fn description(&self) -> &str {
        "Search the web for images and return HTML img tags with class \
         'rounded mt-3 h-[300px] w-[300px]' for inserting the images in the chat."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The image search query"
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
                reason: "image search is not configured".to_string(),
            }
        })?;

        let data: Value = self
            .http
            .get(SEARCH_ENDPOINT)
            .query(&[
                ("key", credentials.api_key.as_str()),
                ("cx", credentials.engine_id.as_str()),
                ("q", query),
                ("searchType", "image"),
                ("num", "5"),
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

        Ok(format_image_tags(&data))
    }
}

pub(crate) fn format_image_tags(data: &Value) -> String {
    let Some(items) = data.get("items").and_then(Value::as_array) else {
        return "No images found.".to_string();
    };

    let mut output = String::new();
    for item in items {
        let link = item.get("link").and_then(Value::as_str).unwrap_or("");
        let title = item.get("title").and_then(Value::as_str).unwrap_or("");
        output.push_str(&format!(
            "<img src='{link}' alt='{title}' class='rounded mt-3 h-[300px] w-[300px]' />"
        ));
    }
    output.push_str(
        "\n\nRemember to return images in html img tags for displaying in the chat, \
         example ```<img src='url' alt='title' class='rounded mt-3 h-[300px] w-[300px]' />```",
    );
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_one_img_tag_per_result() {
        let data = serde_json::json!({
            "items": [
                {"link": "https://img.example/a.png", "title": "A"},
                {"link": "https://img.example/b.png", "title": "B"}
            ]
        });
        let text = format_image_tags(&data);
        assert_eq!(text.matches("<img src='https://img.example/").count(), 2);
        assert!(text.contains("Remember to return images"));
    }
}
