mod catalog;
mod chat;
mod config;
mod error;
mod i18n;
mod images;
mod listings;
mod mail;
mod models;
mod routes;
mod state;
mod translation;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chat::SqlConversationLog;
use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();

    if std::env::args().any(|arg| arg == "--init-db") {
        let log = SqlConversationLog::connect(&config.database_url)
            .await
            .context("Failed to initialise conversation database")?;
        info!("Database initialised, {} conversations stored", log.count().await?);
        return Ok(());
    }

    info!("🏠 Group Real Estate site");
    info!("Static files from {}", config.static_dir.display());

    let state = Arc::new(AppState::from_config(&config).await?);
    let app = routes::router(state, &config.static_dir, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("Listening on http://{}", config.bind);

    axum::serve(listener, app).await?;

    Ok(())
}
