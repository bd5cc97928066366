//! HTTP surface of the relay and the observer fan-out.

pub mod broadcast;
pub mod calculator;
pub mod rest;
pub mod socket;

use std::sync::Arc;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::interfaces::BookingStore;
use broadcast::Broadcaster;

/// Shared state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BookingStore>,
    pub broadcaster: Arc<Broadcaster>,
}

impl AppState {
    pub fn new(store: Arc<dyn BookingStore>, broadcaster: Arc<Broadcaster>) -> Self {
        Self { store, broadcaster }
    }
}

/// Build the relay router: booking REST routes plus the observer socket.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(rest::routes())
        .merge(socket::routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Serve `app` on `addr` until `shutdown` resolves.
///
/// When the port is 0, the OS assigns an ephemeral port. The actual bound
/// address is always logged so it can be discovered.
pub async fn serve<F>(
    app: Router,
    addr: &str,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    info!(address = %local, "HTTP server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
