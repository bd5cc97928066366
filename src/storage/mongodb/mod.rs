//! MongoDB implementation of the booking store.

mod booking_store;
mod decode;

pub use booking_store::MongoBookingStore;
pub use decode::{booking_from_document, raw_change_from_event};
