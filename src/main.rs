use signal_relay::api::{run_server, AppState};
use signal_relay::config::AppConfig;
use signal_relay::llm::LLMClient;
use signal_relay::messaging::build_relay;
use signal_relay::prompt::PromptBuilder;
use signal_relay::services::keep_alive::KeepAliveService;
use signal_relay::{RelayPipeline, SignalDeduplicator};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Setup Logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Signal Relay...");

    // Load Configuration
    let config = AppConfig::load()?;
    info!("Loaded Configuration: {:?}", config);

    if config.llm.api_key.is_none() {
        warn!("⚠️ OPENAI_API_KEY not set - completion requests will be rejected upstream");
    }
    if let Some(url) = &config.llm.base_url {
        info!("Using Custom OpenAI Base URL: {}", url);
    }
    info!("Using LLM Model: {}", config.llm.model);

    // Initialize Collaborators
    let completion = Arc::new(LLMClient::from_config(&config.llm));
    let relay = build_relay(&config.telegram)?;
    info!("Relaying replies via: {}", relay.name());

    let dedup = Arc::new(SignalDeduplicator::from_config(&config.dedup));
    info!(
        "🛡️ Duplicate suppression: {}s window, {} slot(s)",
        dedup.window().as_secs(),
        dedup.slots()
    );

    let pipeline = RelayPipeline::new(
        dedup,
        PromptBuilder::new(config.prompt.clone()),
        completion,
        relay,
    );
    let app_state = Arc::new(AppState { pipeline });

    // Keep-Alive (optional, for free-tier hosts)
    let _keep_alive = match std::env::var("KEEP_ALIVE_URL") {
        Ok(url) => {
            info!("🔔 Starting Keep-Alive Service for: {}", url);
            let service = KeepAliveService::new(url)?;
            let started = match std::env::var("KEEP_ALIVE_CRON") {
                Ok(schedule) => service.start_with_schedule(&schedule).await,
                Err(_) => service.start().await,
            };
            match started {
                Ok(scheduler) => Some(scheduler),
                Err(e) => {
                    warn!("⚠️ Failed to start keep-alive service: {}", e);
                    None
                }
            }
        }
        Err(_) => {
            info!("ℹ️ KEEP_ALIVE_URL not set - keep-alive service disabled");
            None
        }
    };

    // Start API Server
    run_server(app_state, &config.server.bind_addr()).await?;

    Ok(())
}
