use std::sync::Arc;

use anyhow::Context;
use db::DBService;
use server::{AppState, config::Config, routes};
use services::services::{
    claude_api::{ChatCompletion, ClaudeApiClient, UnconfiguredCompletion},
    storage::LocalObjectStorage,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let sentry_guard = utils::logging::init_sentry(config.sentry_dsn.as_deref());
    utils::logging::init(sentry_guard.is_some());

    let db = DBService::new(&config.database_url)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;

    let completion: Arc<dyn ChatCompletion> = match config.anthropic_api_key.clone() {
        Some(key) => Arc::new(ClaudeApiClient::new(key, config.anthropic_model.clone())?),
        None => {
            warn!("ANTHROPIC_API_KEY is not set, chat assistant will answer with its fallback");
            Arc::new(UnconfiguredCompletion)
        }
    };

    tokio::fs::create_dir_all(&config.media_root)
        .await
        .with_context(|| format!("failed to create {}", config.media_root.display()))?;
    let storage = Arc::new(LocalObjectStorage::new(
        config.media_root.clone(),
        config.media_public_url.clone(),
    ));

    let state = AppState::new(
        db,
        completion,
        storage,
        config.chat_log_enabled,
        config.chat_rate_limit,
    );
    let app = routes::router(state, &config.media_root);

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %listener.local_addr()?, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
}
