//! gst-calculator: reference GST calculation service
//!
//! Computes CGST and SGST at 9% each for a booking amount. Used for local
//! runs of the relay and in tests.
//!
//! ## Configuration
//! - PORT: HTTP port (default: 8000)
//! - GST_RELAY_LOG: log filter (default: info)

use tracing::info;

use gst_relay::handlers::{calculator, serve};
use gst_relay::utils::bootstrap::{init_tracing, shutdown_signal};

const DEFAULT_PORT: u16 = 8000;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing();

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    info!(port, "Starting gst-calculator");
    serve(calculator::router(), &format!("0.0.0.0:{}", port), shutdown_signal()).await
}
