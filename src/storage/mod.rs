//! Storage implementations.

use std::sync::Arc;

use tracing::info;

use crate::config::{StorageConfig, StorageType};
use crate::interfaces::BookingStore;

pub mod memory;

#[cfg(feature = "mongodb")]
pub mod mongodb;

pub use crate::interfaces::StorageError;
pub use memory::MemoryBookingStore;

#[cfg(feature = "mongodb")]
pub use mongodb::MongoBookingStore;

/// Initialize the booking store based on configuration.
pub async fn init_storage(
    config: &StorageConfig,
) -> Result<Arc<dyn BookingStore>, Box<dyn std::error::Error>> {
    info!(storage_type = %config.storage_type, "Initializing booking store");

    match config.storage_type {
        StorageType::Memory => {
            let store = MemoryBookingStore::with_bookings(config.seed.clone());
            info!(bookings = config.seed.len(), "Memory store seeded");
            Ok(Arc::new(store))
        }
        #[cfg(feature = "mongodb")]
        StorageType::Mongodb => {
            let client = ::mongodb::Client::with_uri_str(&config.mongodb.uri).await?;
            let store = MongoBookingStore::new(&client, &config.mongodb).await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "mongodb"))]
        StorageType::Mongodb => {
            tracing::error!("MongoDB storage requested but 'mongodb' feature is not enabled");
            Err("MongoDB feature not enabled".into())
        }
    }
}
