//! Booking store interface.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde_json::{Map, Value};

use crate::booking::{Booking, BookingStatus};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Booking not found: {0}")]
    NotFound(String),

    #[error("Change feed disconnected: {0}")]
    FeedDisconnected(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[cfg(feature = "mongodb")]
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),
}

/// Kind of mutation reported by the change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Insert,
    Update,
    Replace,
    Delete,
    /// Anything else the store reports (drops, renames, invalidations).
    Other,
}

/// A change notification as delivered by the store, before decoding.
///
/// Field values are carried as JSON so the watcher stays independent of the
/// store's native document format.
#[derive(Debug, Clone, PartialEq)]
pub struct RawChange {
    pub operation: OperationKind,
    /// Key of the mutated document.
    pub document_id: String,
    /// Fields set by the mutation (empty for non-update operations).
    pub updated_fields: Map<String, Value>,
    /// Pre-mutation document, when the store is able to supply it.
    pub before: Option<Map<String, Value>>,
}

impl RawChange {
    /// Build an update notification.
    pub fn update(
        document_id: impl Into<String>,
        updated_fields: Map<String, Value>,
        before: Option<Map<String, Value>>,
    ) -> Self {
        Self {
            operation: OperationKind::Update,
            document_id: document_id.into(),
            updated_fields,
            before,
        }
    }
}

/// Live change feed.
///
/// Ends or yields an error when the underlying subscription is lost; callers
/// re-open it with [`BookingStore::watch`]. Not resumable: changes made while
/// no feed is open are never delivered.
pub type ChangeFeed = Pin<Box<dyn Stream<Item = Result<RawChange>> + Send>>;

/// Interface for the booking record store.
///
/// Implementations:
/// - `MongoBookingStore`: MongoDB collection with change streams
/// - `MemoryBookingStore`: in-process map with a broadcast change feed
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// List all bookings.
    async fn list(&self) -> Result<Vec<Booking>>;

    /// Fetch a booking by id. Returns `None` if it does not exist.
    async fn find(&self, id: &str) -> Result<Option<Booking>>;

    /// Set the status of a booking. Unknown ids are not an error.
    async fn update_status(&self, id: &str, status: BookingStatus) -> Result<()>;

    /// Open a new change feed starting at "now".
    async fn watch(&self) -> Result<ChangeFeed>;
}
