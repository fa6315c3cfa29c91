use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use visitor_log::config::{self, StorageBackend};
use visitor_log::geoip::HttpGeoLookup;
use visitor_log::{store, web};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before any other initialization)
    let _ = dotenvy::dotenv();

    // Load configuration first so the log level can come from it
    let config = config::Config::load()?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.to_lowercase()));

    // Use LOG_FORMAT=gcp for structured GCP Cloud Logging
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "gcp" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting Visitor Log...");

    let store = store::from_config(&config.storage);
    match config.storage.backend {
        StorageBackend::File => info!("Visit log: {}", config.storage.path),
        StorageBackend::Memory => info!("Visit log: in-memory (lost on restart)"),
    }

    let geo = Arc::new(HttpGeoLookup::new(&config.geolocation)?);
    info!(
        "Geolocation via {:?} at {} (timeout {}s)",
        config.geolocation.provider,
        config.geolocation.base_url(),
        config.geolocation.timeout_secs
    );

    let state = Arc::new(web::AppState::new(store, geo));

    // Start web server (blocking)
    web::start_server(&config, state).await?;

    Ok(())
}
