//! gst-relay - booking change relay
//!
//! Watches the booking store for status changes, enriches completed bookings
//! with a GST breakdown from an external calculation service, and fans the
//! results out to connected observers.

pub mod booking;
pub mod clients;
pub mod config;
pub mod handlers;
pub mod interfaces;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_utils;

pub use booking::{Booking, BookingStatus};
pub use handlers::broadcast::{BroadcastMessage, Broadcaster, Subscription};
pub use services::watcher::{MutationWatcher, WatcherHandle};
