//! MongoDB BookingStore implementation.

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use mongodb::bson::{doc, Document};
use mongodb::options::FullDocumentBeforeChangeType;
use mongodb::{Client, Collection, Database};
use tracing::{info, warn};

use crate::booking::{Booking, BookingStatus, STATUS_FIELD};
use crate::config::MongodbConfig;
use crate::interfaces::booking_store::{BookingStore, ChangeFeed, Result};

use super::decode::{booking_from_document, id_filter, raw_change_from_event};

/// MongoDB implementation of BookingStore.
///
/// The change feed is a change stream on the bookings collection. Pre-images
/// are requested with `whenAvailable`, so collections without
/// `changeStreamPreAndPostImages` still stream, just without a previous
/// status.
pub struct MongoBookingStore {
    database: Database,
    bookings: Collection<Document>,
    collection_name: String,
}

impl MongoBookingStore {
    /// Create a new MongoDB booking store.
    ///
    /// Fails if the server cannot be reached.
    pub async fn new(client: &Client, config: &MongodbConfig) -> Result<Self> {
        let database = client.database(&config.database);
        database.run_command(doc! { "ping": 1 }).await?;
        let bookings = database.collection(&config.collection);

        let store = Self {
            database,
            bookings,
            collection_name: config.collection.clone(),
        };

        if config.enable_pre_images {
            store.enable_pre_images().await;
        }

        info!(
            database = %config.database,
            collection = %config.collection,
            "MongoDB booking store ready"
        );
        Ok(store)
    }

    /// Turn on change stream pre-images for the collection.
    ///
    /// Failure is not fatal: older servers or missing privileges leave the
    /// feed without previous values.
    async fn enable_pre_images(&self) {
        let command = doc! {
            "collMod": &self.collection_name,
            "changeStreamPreAndPostImages": { "enabled": true },
        };
        match self.database.run_command(command).await {
            Ok(_) => info!(collection = %self.collection_name, "Change stream pre-images enabled"),
            Err(e) => warn!(
                collection = %self.collection_name,
                error = %e,
                "Could not enable pre-images, previous status will be unknown"
            ),
        }
    }
}

#[async_trait]
impl BookingStore for MongoBookingStore {
    async fn list(&self) -> Result<Vec<Booking>> {
        let docs: Vec<Document> = self.bookings.find(doc! {}).await?.try_collect().await?;
        docs.iter().map(booking_from_document).collect()
    }

    async fn find(&self, id: &str) -> Result<Option<Booking>> {
        match self.bookings.find_one(id_filter(id)).await? {
            Some(doc) => Ok(Some(booking_from_document(&doc)?)),
            None => Ok(None),
        }
    }

    async fn update_status(&self, id: &str, status: BookingStatus) -> Result<()> {
        self.bookings
            .update_one(
                id_filter(id),
                doc! { "$set": { STATUS_FIELD: status.as_str() } },
            )
            .await?;
        Ok(())
    }

    async fn watch(&self) -> Result<ChangeFeed> {
        let stream = self
            .bookings
            .watch()
            .full_document_before_change(FullDocumentBeforeChangeType::WhenAvailable)
            .await?;

        info!(collection = %self.collection_name, "Change stream opened");

        let feed = stream.map(|event| raw_change_from_event(event?));
        Ok(Box::pin(feed))
    }
}
