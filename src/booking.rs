//! Booking record and status types.
//!
//! The record is owned by the booking store; this crate only reads
//! snapshots of it and observes mutations.

use serde::{Deserialize, Serialize};

/// Field name carrying the booking status in stored documents.
pub const STATUS_FIELD: &str = "status";
/// Field name carrying the booking amount in stored documents.
pub const AMOUNT_FIELD: &str = "total_booking_amount";

/// Status values for a booking.
///
/// Provides compile-time safety for status comparisons and transitions.
/// Converts to/from the lowercase strings stored in the database.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Finished,
}

impl BookingStatus {
    /// Get the string representation of this status.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Finished => "finished",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a stored status string is not a known status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown booking status: {0:?}")]
pub struct UnknownStatus(pub String);

impl std::str::FromStr for BookingStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "finished" => Ok(Self::Finished),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Allow comparing BookingStatus with &str directly.
impl PartialEq<str> for BookingStatus {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

/// A booking snapshot as read from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// Opaque identifier assigned by the store.
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub total_booking_amount: f64,
    pub status: BookingStatus,
}

impl Booking {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        total_booking_amount: f64,
        status: BookingStatus,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            total_booking_amount,
            status,
        }
    }
}
