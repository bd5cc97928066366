//! Fan-out of relay messages to connected observers.
//!
//! Each observer owns a bounded channel. Publishing never waits on an
//! observer: a full buffer drops the message for that observer only, and a
//! closed observer is removed. There is no history; an observer only sees
//! messages published while it is subscribed.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, RwLock};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default per-observer buffer size.
pub const DEFAULT_OBSERVER_BUFFER: usize = 32;

/// Identity of a connected observer.
pub type ObserverId = Uuid;

/// Message delivered to observers.
///
/// Serializes as `{"event": <name>, "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum BroadcastMessage {
    #[serde(rename = "logMessage")]
    LogMessage { log: String },

    #[serde(rename = "bookingUpdated", rename_all = "camelCase")]
    BookingUpdated {
        id: String,
        updated_fields: Map<String, Value>,
    },
}

impl BroadcastMessage {
    pub fn log(text: impl Into<String>) -> Self {
        Self::LogMessage { log: text.into() }
    }

    pub fn booking_updated(id: impl Into<String>, updated_fields: Map<String, Value>) -> Self {
        Self::BookingUpdated {
            id: id.into(),
            updated_fields,
        }
    }

    /// Wire event name.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::LogMessage { .. } => "logMessage",
            Self::BookingUpdated { .. } => "bookingUpdated",
        }
    }
}

type ObserverSender = mpsc::Sender<Arc<BroadcastMessage>>;

/// Receiving half handed to a newly connected observer.
///
/// Dropping it disconnects the observer.
pub struct Subscription {
    id: ObserverId,
    receiver: mpsc::Receiver<Arc<BroadcastMessage>>,
}

impl Subscription {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Wait for the next message.
    pub async fn recv(&mut self) -> Option<Arc<BroadcastMessage>> {
        self.receiver.recv().await
    }

    /// Take a message if one is already buffered.
    pub fn try_recv(&mut self) -> Option<Arc<BroadcastMessage>> {
        self.receiver.try_recv().ok()
    }

    pub fn into_stream(self) -> ReceiverStream<Arc<BroadcastMessage>> {
        ReceiverStream::new(self.receiver)
    }
}

/// Multi-observer publish primitive.
///
/// Cheap to share behind an `Arc`; subscribe, unsubscribe and publish may
/// run concurrently.
pub struct Broadcaster {
    observers: Arc<RwLock<HashMap<ObserverId, ObserverSender>>>,
    buffer: usize,
}

impl Broadcaster {
    /// Create a broadcaster with the given per-observer buffer size.
    pub fn new(buffer: usize) -> Self {
        Self {
            observers: Arc::new(RwLock::new(HashMap::new())),
            buffer: buffer.max(1),
        }
    }

    /// Register a new observer.
    ///
    /// Spawns a watcher that removes the observer as soon as its
    /// subscription is dropped, so disconnects are reclaimed even when
    /// nothing is being published.
    pub async fn subscribe(&self) -> Subscription {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.buffer);
        let cleanup_tx = tx.clone();

        let count = {
            let mut observers = self.observers.write().await;
            observers.insert(id, tx);
            observers.len()
        };
        info!(observer = %id, observers = count, "Observer connected");

        let observers = Arc::clone(&self.observers);
        tokio::spawn(async move {
            cleanup_tx.closed().await;
            if observers.write().await.remove(&id).is_some() {
                debug!(observer = %id, "Observer disconnected, removed");
            }
        });

        Subscription { id, receiver: rx }
    }

    /// Remove an observer. Returns false if it was not registered.
    pub async fn unsubscribe(&self, id: ObserverId) -> bool {
        let removed = self.observers.write().await.remove(&id).is_some();
        if removed {
            info!(observer = %id, "Observer unsubscribed");
        }
        removed
    }

    /// Number of currently registered observers.
    pub async fn observer_count(&self) -> usize {
        self.observers.read().await.len()
    }

    /// Deliver a message to every observer registered at the time of the call.
    ///
    /// Returns the number of observers the message was queued for.
    #[tracing::instrument(
        name = "broadcast.publish",
        skip_all,
        fields(event = message.event_name())
    )]
    pub async fn publish(&self, message: BroadcastMessage) -> usize {
        let message = Arc::new(message);
        let mut closed = Vec::new();
        let mut sent = 0;

        {
            let observers = self.observers.read().await;
            for (id, sender) in observers.iter() {
                match sender.try_send(Arc::clone(&message)) {
                    Ok(()) => sent += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!(observer = %id, "Observer buffer full, message dropped");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*id),
                }
            }
        }

        if !closed.is_empty() {
            let mut observers = self.observers.write().await;
            for id in &closed {
                observers.remove(id);
            }
            debug!(
                removed = closed.len(),
                "Removing disconnected observers during delivery"
            );
        }

        debug!(sent, "Message delivered to observers");
        sent
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_OBSERVER_BUFFER)
    }
}
