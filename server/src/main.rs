use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use zonify_server::config::Config;
use zonify_server::llm::{GeminiClient, GenerativeModel};
use zonify_server::places::{GooglePlacesClient, PlacesLookup};
use zonify_server::server::{self, state::AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("zonify_server=info,tower_http=info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    if config.gemini_api_key.as_deref().unwrap_or("").is_empty() {
        warn!("GEMINI_API_KEY is not set; chat replies will use the offline fallback");
    }

    let model: Arc<dyn GenerativeModel> = Arc::new(
        GeminiClient::new(config.gemini_settings()).context("Failed to build model client")?,
    );

    let places: Option<Arc<dyn PlacesLookup>> = match config.places_key() {
        Some(key) => {
            let client =
                GooglePlacesClient::new(key, &config.places_base_url, config.upstream_timeout())
                    .context("Failed to build places client")?;
            Some(Arc::new(client))
        }
        None => {
            warn!("GOOGLE_MAPS_API_KEY is not set; location analysis runs without nearby places");
            None
        }
    };

    let state = AppState::new(model, places, config.reports_dir.clone());
    let app = server::app(state, config.max_body_bytes());

    let addr = config.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(
        "zonify-server listening on http://{} (model {}, reports in {})",
        addr,
        config.gemini_model,
        config.reports_dir.display()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
