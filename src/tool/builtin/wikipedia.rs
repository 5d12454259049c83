use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::read_website::extract_paragraphs;
use crate::tool::{Tool, ToolError, require_str};

// Article text is capped; the model only needs enough context to answer.
const EXTRACT_LIMIT: usize = 1200;

/// Wikipedia lookup: search for the best-matching page, then return its
/// paragraph text.
pub struct WikipediaTool {
    http: Client,
}

impl WikipediaTool {
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
impl Tool for WikipediaTool {
    fn name(&self) -> &str {
        "wikipedia_search"
    }

    fn description(&self) -> &str {
        "Search Wikipedia for the query and return the text of the best-matching article. \
         Good for factual and background information."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The topic to look up"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let query = require_str(self.name(), &args, "query")?;

        let search_url = format!(
            "https://en.wikipedia.org/w/api.php?action=query&format=json&list=search&srsearch={}",
            urlencoding::encode(query)
        );
        let search: Value = self
            .http
            .get(&search_url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| self.fail(e))?
            .json()
            .await
            .map_err(|e| self.fail(e))?;

        let Some(page_id) = search
            .pointer("/query/search/0/pageid")
            .and_then(Value::as_u64)
        else {
            return Ok(String::new());
        };

        let page_url = format!(
            "https://en.wikipedia.org/w/api.php?action=parse&format=json&pageid={page_id}"
        );
        let page: Value = self
            .http
            .get(&page_url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| self.fail(e))?
            .json()
            .await
            .map_err(|e| self.fail(e))?;

        let html = page
            .pointer("/parse/text/*")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let mut text = extract_paragraphs(html);
        if text.len() > EXTRACT_LIMIT {
            text = truncate_on_char_boundary(&text, EXTRACT_LIMIT);
        }
        Ok(text)
    }
}

fn truncate_on_char_boundary(text: &str, limit: usize) -> String {
    let mut end = limit;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_never_splits_a_character() {
        let text = "héllo wörld ".repeat(200);
        let cut = truncate_on_char_boundary(&text, EXTRACT_LIMIT);
        assert!(cut.len() <= EXTRACT_LIMIT);
        assert!(text.starts_with(&cut));
    }
}
