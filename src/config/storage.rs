//! Storage configuration types.

use serde::Deserialize;

use crate::booking::Booking;

/// Storage type discriminator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    #[default]
    Mongodb,
    Memory,
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageType::Mongodb => write!(f, "mongodb"),
            StorageType::Memory => write!(f, "memory"),
        }
    }
}

/// Storage configuration (discriminated union).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage type discriminator.
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    /// MongoDB-specific configuration.
    pub mongodb: MongodbConfig,
    /// Bookings loaded into the memory store at startup.
    pub seed: Vec<Booking>,
}

/// MongoDB-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MongodbConfig {
    /// MongoDB connection URI. Change streams require a replica set.
    pub uri: String,
    /// Database name.
    pub database: String,
    /// Bookings collection name.
    pub collection: String,
    /// Enable pre-images on the collection at startup (MongoDB 6.0+).
    ///
    /// Without pre-images the previous status of a change is unknown and
    /// `finished -> pending` corrections cannot be suppressed.
    pub enable_pre_images: bool,
}

impl Default for MongodbConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "bookings".to_string(),
            collection: "bookings".to_string(),
            enable_pre_images: true,
        }
    }
}
