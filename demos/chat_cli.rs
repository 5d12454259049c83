//! # Chat CLI Demo
//!
//! A terminal loop against the turn engine, without the HTTP layer.
//!
//! ## Usage
//!
//! ```bash
//! export GROQ_API_KEY="your-api-key"
//! cargo run --example chat_cli
//! ```

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use luna_bot::prelude::*;
use luna_bot::history::MemoryHistory;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let http = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()?;

    let llm = Arc::new(OpenAiClient::new(
        http.clone(),
        config.api_key.clone(),
        config.base_url.clone(),
    ));
    let registry = Arc::new(builtin_registry(&http, &config));
    let prompts = Arc::new(SystemPromptManager::new());
    let store = Arc::new(ConversationStore::new(prompts, Arc::new(MemoryHistory::new())));

    let agent = Agent::new(store, llm, registry, AgentConfig::from(&config));

    println!("Luna is ready. Empty line exits.");
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        stdin.lock().read_line(&mut line)?;
        let message = line.trim();
        if message.is_empty() {
            break;
        }

        let answer = agent.chat(message, Some("cli"), None).await;
        println!("\n{answer}\n");
    }

    Ok(())
}
