use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use super::{ConversationHistory, HistoryError, StoredConversation};
use crate::conversation::Message;

/// Supabase-backed history, talking PostgREST directly over HTTP.
///
/// Rows live in a `conversations` table keyed by `conversation_id`, with
/// the full transcript stored as a JSON column.
#[derive(Debug, Clone)]
pub struct SupabaseHistory {
    http: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseHistory {
    /// Creates a client for the given project url and service key.
    pub fn new(http: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/conversations", self.base_url)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, HistoryError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(HistoryError::Backend(format!("{status}: {body}")))
        }
    }
}

#[async_trait]
impl ConversationHistory for SupabaseHistory {
    async fn save(
        &self,
        user_id: &str,
        conversation_id: &str,
        messages: &[Message],
    ) -> Result<(), HistoryError> {
        debug!(conversation_id, count = messages.len(), "Saving conversation");
        let response = self
            .request(self.http.post(self.table_url()))
            .header("Prefer", "resolution=merge-duplicates")
            .query(&[("on_conflict", "conversation_id")])
            .json(&json!([{
                "conversation_id": conversation_id,
                "user_id": user_id,
                "messages": messages,
            }]))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn load(&self, conversation_id: &str) -> Result<Option<Vec<Message>>, HistoryError> {
        let response = self
            .request(self.http.get(self.table_url()))
            .query(&[
                ("conversation_id", format!("eq.{conversation_id}")),
                ("select", "messages".to_string()),
            ])
            .send()
            .await?;
        let rows: Vec<serde_json::Value> = Self::check(response).await?.json().await?;

        match rows.into_iter().next() {
            Some(row) => {
                let messages = serde_json::from_value(row["messages"].clone())
                    .map_err(|e| HistoryError::Backend(format!("bad messages column: {e}")))?;
                Ok(Some(messages))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, conversation_id: &str) -> Result<(), HistoryError> {
        let response = self
            .request(self.http.delete(self.table_url()))
            .query(&[("conversation_id", format!("eq.{conversation_id}"))])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), HistoryError> {
        let response = self
            .request(self.http.delete(self.table_url()))
            .query(&[("user_id", format!("eq.{user_id}"))])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn list(&self, user_id: &str) -> Result<Vec<StoredConversation>, HistoryError> {
        let response = self
            .request(self.http.get(self.table_url()))
            .query(&[
                ("user_id", format!("eq.{user_id}")),
                ("select", "conversation_id,user_id,messages".to_string()),
            ])
            .send()
            .await?;
        let rows = Self::check(response).await?.json().await?;
        Ok(rows)
    }
}
