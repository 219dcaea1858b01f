//! locator-web — Axum entry point hosting the GPS locator plugin over HTTP.

mod server;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use locator_core::config::Config;
use locator_core::types::Settings;
use locator_core::{GpsPlugin, LocationReplyResolver};

use server::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config_path = std::env::var("LOCATOR_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("config.yaml")
        });

    let config = if config_path.exists() {
        Config::load(&config_path)?
    } else {
        warn!("No config at {}, using defaults", config_path.display());
        Config::from_yaml("{}")?
    };

    if config.geocoding.api_key.is_none() {
        warn!("No geocoding API key configured; every lookup will fall back to error templates");
    }
    info!(
        source = ?config.geolocation.source,
        geocoding_url = %config.geocoding.base_url,
        "Geolocation configured"
    );

    let resolver = LocationReplyResolver::from_config(&config)?;
    let plugin = GpsPlugin::new(resolver, Settings(config.settings.clone()));
    let state = Arc::new(AppState::new(plugin));
    server::spawn_diagnostics_recorder(Arc::clone(&state));

    let app = server::router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);
    let addr = format!("0.0.0.0:{}", port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on http://localhost:{}", port);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")?;

    info!("Server stopped.");
    Ok(())
}
