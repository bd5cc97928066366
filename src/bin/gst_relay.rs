//! gst-relay: booking change relay
//!
//! Watches the booking store for status changes and pushes them to
//! WebSocket observers, enriching finished bookings with GST details.
//!
//! ## Architecture
//! ```text
//! [booking store] --change feed--> [watcher] --GST lookup--> [calculator]
//!        ^                              |
//!   PUT /bookings/:id                   v
//!        |                        [broadcaster] --> GET /ws observers
//! ```
//!
//! ## Configuration
//! - `--config <path>` / GST_RELAY_CONFIG: YAML configuration file
//! - GST_RELAY__<SECTION>__<KEY>: per-key overrides
//! - PORT, MONGO_URI, GST_API_URL: plain overrides
//! - GST_RELAY_LOG: log filter (default: info)

use std::sync::Arc;

use tracing::{error, info};

use gst_relay::clients::GstServiceClient;
use gst_relay::Broadcaster;
use gst_relay::config::Config;
use gst_relay::handlers::{self, AppState};
use gst_relay::services::MutationWatcher;
use gst_relay::storage::init_storage;
use gst_relay::utils::bootstrap::{
    connect_with_retry, init_tracing, parse_config_path, shutdown_signal,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing();

    let config_path = parse_config_path();
    let config = Config::load(config_path.as_deref()).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        storage = %config.storage.storage_type,
        gst_api = %config.enrichment.url,
        "Starting gst-relay"
    );

    let store = connect_with_retry("booking-store", || async {
        init_storage(&config.storage)
            .await
            .map_err(|e| e.to_string())
    })
    .await?;

    let broadcaster = Arc::new(Broadcaster::new(config.watcher.observer_buffer));
    let calculator = Arc::new(GstServiceClient::new(&config.enrichment)?);

    let watcher = MutationWatcher::new(
        Arc::clone(&store),
        calculator,
        Arc::clone(&broadcaster),
        config.watcher.clone(),
    )
    .spawn();

    let app = handlers::router(AppState::new(store, broadcaster));
    let served = handlers::serve(app, &config.server.bind_address(), shutdown_signal()).await;

    watcher.shutdown().await;
    info!("gst-relay stopped");
    served
}
