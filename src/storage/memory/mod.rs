//! In-memory booking store.
//!
//! Used by the `memory` storage mode and by tests. Mutations are published
//! on a broadcast channel that backs the change feed; feeds only see
//! mutations made after they were opened, like a MongoDB change stream
//! without a resume token.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{Map, Value};
use tokio::sync::{broadcast, RwLock};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

use crate::booking::{Booking, BookingStatus, STATUS_FIELD};
use crate::interfaces::booking_store::{
    BookingStore, ChangeFeed, OperationKind, RawChange, Result, StorageError,
};

/// Change feed buffer; slower consumers lose their feed.
const FEED_CAPACITY: usize = 1024;

/// In-memory booking store with a live change feed.
pub struct MemoryBookingStore {
    bookings: RwLock<BTreeMap<String, Booking>>,
    feed: Mutex<broadcast::Sender<RawChange>>,
    pre_images: bool,
    fail_reads: RwLock<bool>,
    failing_watches: RwLock<u32>,
}

impl Default for MemoryBookingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            bookings: RwLock::new(BTreeMap::new()),
            feed: Mutex::new(sender),
            pre_images: true,
            fail_reads: RwLock::new(false),
            failing_watches: RwLock::new(0),
        }
    }

    /// Create a store holding the given bookings.
    pub fn with_bookings(bookings: impl IntoIterator<Item = Booking>) -> Self {
        let mut store = Self::new();
        let map = bookings.into_iter().map(|b| (b.id.clone(), b)).collect();
        store.bookings = RwLock::new(map);
        store
    }

    /// Stop attaching pre-images to update notifications.
    pub fn without_pre_images(mut self) -> Self {
        self.pre_images = false;
        self
    }

    /// Make `list` and `find` fail until reset.
    pub async fn set_fail_reads(&self, fail: bool) {
        *self.fail_reads.write().await = fail;
    }

    /// Make the next `count` calls to `watch` fail.
    pub async fn fail_next_watches(&self, count: u32) {
        *self.failing_watches.write().await = count;
    }

    /// Terminate every open change feed. New feeds can be opened afterwards.
    pub fn disconnect_feeds(&self) {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        let old = match self.feed.lock() {
            Ok(mut feed) => std::mem::replace(&mut *feed, sender),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), sender),
        };
        debug!(feeds = old.receiver_count(), "Change feeds disconnected");
    }

    /// Number of currently open change feeds.
    pub fn open_feeds(&self) -> usize {
        self.sender().receiver_count()
    }

    /// Insert a booking, replacing any with the same id.
    pub async fn insert(&self, booking: Booking) {
        let id = booking.id.clone();
        self.bookings.write().await.insert(id.clone(), booking);
        self.emit(RawChange {
            operation: OperationKind::Insert,
            document_id: id,
            updated_fields: Map::new(),
            before: None,
        });
    }

    /// Delete a booking. Returns false if it did not exist.
    pub async fn delete(&self, id: &str) -> bool {
        let removed = self.bookings.write().await.remove(id).is_some();
        if removed {
            self.emit(RawChange {
                operation: OperationKind::Delete,
                document_id: id.to_string(),
                updated_fields: Map::new(),
                before: None,
            });
        }
        removed
    }

    /// Publish a notification on the feed without touching stored bookings.
    ///
    /// Models mutations whose record is gone by the time the change is
    /// processed, or malformed notifications.
    pub fn inject_change(&self, change: RawChange) {
        self.emit(change);
    }

    fn sender(&self) -> broadcast::Sender<RawChange> {
        match self.feed.lock() {
            Ok(feed) => feed.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn emit(&self, change: RawChange) {
        // No open feeds is fine: nobody is watching.
        let _ = self.sender().send(change);
    }

    async fn check_reads(&self) -> Result<()> {
        if *self.fail_reads.read().await {
            return Err(StorageError::Unavailable("reads disabled".to_string()));
        }
        Ok(())
    }
}

fn to_document(booking: &Booking) -> Option<Map<String, Value>> {
    match serde_json::to_value(booking) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn list(&self) -> Result<Vec<Booking>> {
        self.check_reads().await?;
        Ok(self.bookings.read().await.values().cloned().collect())
    }

    async fn find(&self, id: &str) -> Result<Option<Booking>> {
        self.check_reads().await?;
        Ok(self.bookings.read().await.get(id).cloned())
    }

    async fn update_status(&self, id: &str, status: BookingStatus) -> Result<()> {
        let mut bookings = self.bookings.write().await;
        let Some(booking) = bookings.get_mut(id) else {
            return Ok(());
        };
        if booking.status == status {
            // No-op updates produce no change notification.
            return Ok(());
        }
        let before = to_document(booking).filter(|_| self.pre_images);
        booking.status = status;

        let mut updated_fields = Map::new();
        updated_fields.insert(
            STATUS_FIELD.to_string(),
            Value::String(status.as_str().to_string()),
        );
        // Emit under the write lock so feed order matches mutation order.
        self.emit(RawChange::update(id, updated_fields, before));
        Ok(())
    }

    async fn watch(&self) -> Result<ChangeFeed> {
        {
            let mut failing = self.failing_watches.write().await;
            if *failing > 0 {
                *failing -= 1;
                return Err(StorageError::FeedDisconnected(
                    "change feed unavailable".to_string(),
                ));
            }
        }

        let receiver = self.sender().subscribe();
        let feed = BroadcastStream::new(receiver).map(|item| {
            item.map_err(|e: BroadcastStreamRecvError| {
                StorageError::FeedDisconnected(e.to_string())
            })
        });
        Ok(Box::pin(feed))
    }
}
