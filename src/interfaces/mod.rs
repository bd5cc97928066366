//! Abstract interfaces for gst-relay components.
//!
//! These traits define the contracts for:
//! - Booking storage (read/update plus the live change feed)
//! - Tax calculation (external GST enrichment)

pub mod booking_store;
pub mod tax_calculator;

pub use booking_store::{BookingStore, ChangeFeed, OperationKind, RawChange, StorageError};
pub use tax_calculator::{EnrichmentError, GstDetails, TaxCalculator};
