//! Environment-driven configuration.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm::DEFAULT_BASE_URL;

/// Default model, a Groq-hosted Llama.
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Sampling temperature for the tool-selecting completion.
pub const DEFAULT_TEMPERATURE: f32 = 0.5;

/// Replies at least this long are never fallback-parsed for pseudo-calls.
pub const DEFAULT_FALLBACK_PARSE_MAX_LEN: usize = 70;

/// Google Custom Search credentials, shared by the search tools.
#[derive(Debug, Clone)]
pub struct GoogleSearchConfig {
    pub api_key: String,
    pub engine_id: String,
}

/// SMTP settings for the email tool.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_pass: String,
    pub from_email: String,
    pub from_name: String,
}

impl EmailConfig {
    fn from_env() -> Self {
        Self {
            smtp_host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string()),
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(587),
            smtp_user: std::env::var("SMTP_USER").unwrap_or_default(),
            smtp_pass: std::env::var("SMTP_PASS").unwrap_or_default(),
            from_email: std::env::var("SMTP_FROM_EMAIL")
                .unwrap_or_else(|_| "noreply@example.com".to_string()),
            from_name: std::env::var("SMTP_FROM_NAME").unwrap_or_else(|_| "Luna".to_string()),
        }
    }

    /// Whether a transport can actually be built.
    pub fn is_configured(&self) -> bool {
        !self.smtp_user.is_empty() && !self.smtp_pass.is_empty()
    }
}

/// Supabase project credentials for durable history.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub api_key: String,
}

/// Full backend configuration, loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Completion API key (`GROQ_API_KEY`)
    pub api_key: String,
    /// Completion endpoint base url (`LLM_BASE_URL`)
    pub base_url: String,
    /// Chat model identifier (`CHAT_MODEL`)
    pub model: String,
    /// Sampling temperature for the tool-selecting completion
    pub temperature: f32,
    /// Upper bound for fallback pseudo-call parsing
    pub fallback_parse_max_len: usize,
    /// Timeout applied to every outbound HTTP call
    pub request_timeout: Duration,
    /// Address the HTTP server binds to (`BIND_ADDR`)
    pub bind_addr: SocketAddr,
    /// Google Custom Search credentials, when both env vars are present
    pub google: Option<GoogleSearchConfig>,
    /// SMTP settings for the email tool
    pub email: EmailConfig,
    /// Supabase history backend, when both env vars are present
    pub supabase: Option<SupabaseConfig>,
}

impl Config {
    /// Loads configuration from the environment.
    ///
    /// Only the completion API key is required; everything else has a
    /// default or degrades the matching feature.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GROQ_API_KEY")
            .context("GROQ_API_KEY environment variable is required")?;

        let google = match (
            std::env::var("GOOGLE_SEARCH_API_KEY"),
            std::env::var("GOOGLE_SEARCH_ENGINE_ID"),
        ) {
            (Ok(api_key), Ok(engine_id)) => Some(GoogleSearchConfig { api_key, engine_id }),
            _ => None,
        };

        let supabase = match (std::env::var("SUPABASE_URL"), std::env::var("SUPABASE_KEY")) {
            (Ok(url), Ok(api_key)) => Some(SupabaseConfig { url, api_key }),
            _ => None,
        };

        let bind_addr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .context("BIND_ADDR is not a valid socket address")?;

        Ok(Self {
            api_key,
            base_url: std::env::var("LLM_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            model: std::env::var("CHAT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            temperature: DEFAULT_TEMPERATURE,
            fallback_parse_max_len: DEFAULT_FALLBACK_PARSE_MAX_LEN,
            request_timeout: Duration::from_secs(30),
            bind_addr,
            google,
            email: EmailConfig::from_env(),
            supabase,
        })
    }
}
