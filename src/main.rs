use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use luna_bot::agent::{Agent, AgentConfig};
use luna_bot::config::Config;
use luna_bot::conversation::{ConversationStore, SystemPromptManager};
use luna_bot::history::{ConversationHistory, MemoryHistory, SupabaseHistory};
use luna_bot::llm::OpenAiClient;
use luna_bot::server::{AppState, router};
use luna_bot::tool::builtin::builtin_registry;

/// Luna chat-bot backend server.
#[derive(Debug, Parser)]
#[command(name = "luna-bot", about = "Chat-bot backend with tool calling")]
struct Args {
    /// Address to bind, overriding BIND_ADDR
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    let bind_addr = args.bind.unwrap_or(config.bind_addr);

    let http = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()?;

    let llm = Arc::new(OpenAiClient::new(
        http.clone(),
        config.api_key.clone(),
        config.base_url.clone(),
    ));
    let registry = Arc::new(builtin_registry(&http, &config));

    let history: Arc<dyn ConversationHistory> = match &config.supabase {
        Some(supabase) => {
            info!(url = %supabase.url, "Using Supabase history");
            Arc::new(SupabaseHistory::new(
                http.clone(),
                supabase.url.clone(),
                supabase.api_key.clone(),
            ))
        }
        None => {
            info!("No Supabase configured, history is in-memory only");
            Arc::new(MemoryHistory::new())
        }
    };

    let prompts = Arc::new(SystemPromptManager::new());
    let store = Arc::new(ConversationStore::new(prompts.clone(), history));
    let agent = Arc::new(Agent::new(
        store.clone(),
        llm,
        registry,
        AgentConfig::from(&config),
    ));

    let app = router(AppState {
        agent,
        store,
        prompts,
    });

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(%bind_addr, model = %config.model, "Luna listening");
    axum::serve(listener, app).await?;

    Ok(())
}
