//! The backend's builtin tools, each one thin wrapper around a
//! third-party HTTP API.

pub mod code_executor;
pub mod image_search;
pub mod news_finder;
pub mod qr_code;
pub mod read_website;
pub mod send_email;
pub mod web_search;
pub mod wikipedia;

pub use code_executor::CodeExecutorTool;
pub use image_search::ImageSearchTool;
pub use news_finder::NewsFinderTool;
pub use qr_code::{QR_TOOL_NAME, QrCodeTool};
pub use read_website::ReadWebsiteTool;
pub use send_email::SendEmailTool;
pub use web_search::WebSearchTool;
pub use wikipedia::WikipediaTool;

use std::sync::Arc;

use reqwest::Client;

use crate::config::Config;
use crate::tool::ToolRegistry;

/// Builds the registry with every builtin tool.
pub fn builtin_registry(http: &Client, config: &Config) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(WebSearchTool::new(http.clone(), config.google.clone())));
    registry.register(Arc::new(ImageSearchTool::new(http.clone(), config.google.clone())));
    registry.register(Arc::new(NewsFinderTool::new(http.clone(), config.google.clone())));
    registry.register(Arc::new(WikipediaTool::new(http.clone())));
    registry.register(Arc::new(ReadWebsiteTool::new(http.clone())));
    registry.register(Arc::new(QrCodeTool::new(http.clone())));
    registry.register(Arc::new(SendEmailTool::new(config.email.clone())));
    registry.register(Arc::new(CodeExecutorTool::new(http.clone())));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmailConfig;

    #[test]
    fn registry_contains_every_builtin_tool() {
        let config = Config {
            api_key: "test".to_string(),
            base_url: crate::llm::DEFAULT_BASE_URL.to_string(),
            model: crate::config::DEFAULT_MODEL.to_string(),
            temperature: crate::config::DEFAULT_TEMPERATURE,
            fallback_parse_max_len: crate::config::DEFAULT_FALLBACK_PARSE_MAX_LEN,
            request_timeout: std::time::Duration::from_secs(30),
            bind_addr: "127.0.0.1:3000".parse().unwrap(),
            google: None,
            email: EmailConfig {
                smtp_host: "localhost".to_string(),
                smtp_port: 587,
                smtp_user: String::new(),
                smtp_pass: String::new(),
                from_email: "noreply@example.com".to_string(),
                from_name: "Luna".to_string(),
            },
            supabase: None,
        };

        let registry = builtin_registry(&Client::new(), &config);
        for name in [
            "web_search",
            "image_search",
            "news_finder",
            "wikipedia_search",
            "read_website",
            QR_TOOL_NAME,
            "send_email",
            "code_executor",
        ] {
            assert!(registry.get(name).is_some(), "missing tool: {name}");
        }
    }
}
