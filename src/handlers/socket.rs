//! WebSocket observer endpoint.
//!
//! `GET /ws` upgrades to a WebSocket and registers the connection as a
//! broadcast observer. Each relay message is sent as one JSON text frame:
//! `{"event": "logMessage" | "bookingUpdated", "data": {...}}`.
//! Frames sent by the client are ignored; closing the socket unsubscribes.

use std::fmt::Display;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures::{Sink, SinkExt, StreamExt};
use tracing::{debug, info, warn};

use super::AppState;
use crate::handlers::broadcast::{BroadcastMessage, Subscription};

pub fn routes() -> Router<AppState> {
    Router::new().route("/ws", get(upgrade))
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| observe(socket, state))
}

/// Encode a relay message as a text frame.
fn encode(message: &BroadcastMessage) -> Option<Message> {
    match serde_json::to_string(message) {
        Ok(text) => Some(Message::Text(text)),
        Err(e) => {
            warn!(error = %e, "Failed to encode broadcast message");
            None
        }
    }
}

/// Forward subscription messages into `sink` until either side closes.
async fn forward<S>(mut subscription: Subscription, mut sink: S)
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    while let Some(message) = subscription.recv().await {
        let Some(frame) = encode(&message) else {
            continue;
        };
        if let Err(e) = sink.send(frame).await {
            debug!(error = %e, "Observer socket closed");
            break;
        }
    }
}

async fn observe(socket: WebSocket, state: AppState) {
    let subscription = state.broadcaster.subscribe().await;
    let observer = subscription.id();
    info!(%observer, "WebSocket observer connected");

    let (sink, mut incoming) = socket.split();
    let mut forwarding = tokio::spawn(forward(subscription, sink));

    loop {
        tokio::select! {
            _ = &mut forwarding => break,
            frame = incoming.next() => match frame {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(%observer, error = %e, "WebSocket receive failed");
                    break;
                }
            },
        }
    }

    forwarding.abort();
    state.broadcaster.unsubscribe(observer).await;
    info!(%observer, "WebSocket observer disconnected");
}
