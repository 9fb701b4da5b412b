use std::sync::Arc;
use std::time::Duration;

use dotenv::dotenv;
use gstlens_core::sync::{BackgroundSync, HttpInvoiceRemote, SyncEngine};
use gstlens_core::{db, EventBus, InvoiceStore, SettingsStore, SyncConfig};
use tokio::signal;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Standalone background sync worker.
///
/// Opens the local invoice database, wires the sync engine to the remote
/// API and runs the periodic scheduler until interrupted. Useful for
/// headless deployments; embedded (UI) hosts construct the same pieces
/// themselves and share the event bus with their views.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive(LevelFilter::INFO.into());

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    let config = SyncConfig::from_env();
    info!("Starting GSTLens sync worker (db: {})", config.db_path);

    let pool = db::create_pool(&config.db_path).await?;
    let store = InvoiceStore::new(pool.clone());
    let settings = SettingsStore::new(pool);
    let events = EventBus::new();
    let remote = Arc::new(HttpInvoiceRemote::new(
        &config.api_base,
        config.api_token.clone(),
    ));

    let engine = Arc::new(SyncEngine::new(store, settings, remote, events));
    let scheduler = BackgroundSync::new(engine);

    scheduler.start(
        config.cloud_sync_enabled,
        Duration::from_millis(config.sync_interval_ms),
    );

    signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down gracefully...");

    scheduler.stop();
    info!("GSTLens sync worker stopped");

    Ok(())
}
