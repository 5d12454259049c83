use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::tool::{Tool, ToolError, require_str};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3";

/// Fetches a webpage and returns its paragraph text for summarization.
pub struct ReadWebsiteTool {
    http: Client,
}

impl ReadWebsiteTool {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Tool for ReadWebsiteTool {
    fn name(&self) -> &str {
        "read_website"
    }

    fn description(&self) -> &str {
        "Read the content of the given website URL and return its text. \
         Use when the user provides a URL or after a web search to read a result."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to read"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let url = require_str(self.name(), &args, "url")?;
        let html = fetch_page(&self.http, self.name(), url).await?;
        Ok(extract_paragraphs(&html))
    }
}

/// Fetches a page body with a browser-style user agent.
pub(crate) async fn fetch_page(http: &Client, tool: &str, url: &str) -> Result<String, ToolError> {
    http.get(url)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| ToolError::ExecutionFailed {
            tool: tool.to_string(),
            reason: e.to_string(),
        })?
        .text()
        .await
        .map_err(|e| ToolError::ExecutionFailed {
            tool: tool.to_string(),
            reason: e.to_string(),
        })
}

/// Joins the text of every `<p>` element, blank-line separated.
pub(crate) fn extract_paragraphs(html: &str) -> String {
    let document = Html::parse_document(html);
    let paragraphs = Selector::parse("p").expect("p is a valid selector");
    document
        .select(&paragraphs)
        .map(|p| p.text().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n\n")
}
