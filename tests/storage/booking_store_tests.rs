//! BookingStore interface tests.
//!
//! These tests verify the contract of the BookingStore trait.
//! Each storage implementation should run these tests.
//!
//! Stores have no insert operation, so every test takes a `seed` function
//! that writes a booking directly into the backend.

use std::future::Future;
use std::time::Duration;

use futures::StreamExt;
use uuid::Uuid;

use gst_relay::interfaces::{BookingStore, ChangeFeed, OperationKind, RawChange};
use gst_relay::{Booking, BookingStatus};

/// Create a pending booking with a unique test id.
pub fn make_booking(amount: f64) -> Booking {
    let id = format!("test_{}", Uuid::new_v4().simple());
    Booking::new(id, "Test Guest", amount, BookingStatus::Pending)
}

/// Wait for the next update notification for `id`, skipping unrelated changes.
pub async fn next_update_for(feed: &mut ChangeFeed, id: &str) -> RawChange {
    let wait = async {
        while let Some(item) = feed.next().await {
            let change = item.expect("change feed should not fail");
            if change.operation == OperationKind::Update && change.document_id == id {
                return change;
            }
        }
        panic!("change feed ended before update for {}", id);
    };
    tokio::time::timeout(Duration::from_secs(10), wait)
        .await
        .expect("timed out waiting for update")
}

// =============================================================================
// BookingStore::find tests
// =============================================================================

pub async fn test_find_nonexistent<S: BookingStore>(store: &S) {
    let missing = format!("test_{}", Uuid::new_v4().simple());
    let booking = store.find(&missing).await.expect("find should succeed");
    assert!(booking.is_none(), "nonexistent booking should be None");
}

pub async fn test_find_existing<S, F, Fut>(store: &S, seed: F)
where
    S: BookingStore,
    F: Fn(Booking) -> Fut,
    Fut: Future<Output = ()>,
{
    let booking = make_booking(1000.0);
    seed(booking.clone()).await;

    let found = store
        .find(&booking.id)
        .await
        .expect("find should succeed")
        .expect("seeded booking should exist");
    assert_eq!(found, booking);
}

// =============================================================================
// BookingStore::list tests
// =============================================================================

pub async fn test_list_includes_seeded<S, F, Fut>(store: &S, seed: F)
where
    S: BookingStore,
    F: Fn(Booking) -> Fut,
    Fut: Future<Output = ()>,
{
    let first = make_booking(100.0);
    let second = make_booking(200.0);
    seed(first.clone()).await;
    seed(second.clone()).await;

    let bookings = store.list().await.expect("list should succeed");
    assert!(bookings.contains(&first), "list should include first booking");
    assert!(bookings.contains(&second), "list should include second booking");
}

// =============================================================================
// BookingStore::update_status tests
// =============================================================================

pub async fn test_update_status<S, F, Fut>(store: &S, seed: F)
where
    S: BookingStore,
    F: Fn(Booking) -> Fut,
    Fut: Future<Output = ()>,
{
    let booking = make_booking(1000.0);
    seed(booking.clone()).await;

    store
        .update_status(&booking.id, BookingStatus::Finished)
        .await
        .expect("update should succeed");

    let found = store.find(&booking.id).await.unwrap().unwrap();
    assert_eq!(found.status, BookingStatus::Finished);
    assert_eq!(found.total_booking_amount, booking.total_booking_amount);
}

pub async fn test_update_status_unknown_id<S: BookingStore>(store: &S) {
    let missing = format!("test_{}", Uuid::new_v4().simple());
    store
        .update_status(&missing, BookingStatus::Finished)
        .await
        .expect("updating an unknown booking is not an error");
    assert!(store.find(&missing).await.unwrap().is_none());
}

/// Ids minted as ObjectId hex strings are still plain string keys.
pub async fn test_hex_string_id<S, F, Fut>(store: &S, seed: F)
where
    S: BookingStore,
    F: Fn(Booking) -> Fut,
    Fut: Future<Output = ()>,
{
    let id = Uuid::new_v4().simple().to_string()[..24].to_string();
    let booking = Booking::new(id.clone(), "Hex Guest", 300.0, BookingStatus::Pending);
    seed(booking.clone()).await;

    let found = store
        .find(&id)
        .await
        .expect("find should succeed")
        .expect("hex string id should be found");
    assert_eq!(found, booking);

    store
        .update_status(&id, BookingStatus::Finished)
        .await
        .expect("update should succeed");
    let found = store.find(&id).await.unwrap().unwrap();
    assert_eq!(found.status, BookingStatus::Finished);
}

// =============================================================================
// BookingStore::watch tests
// =============================================================================

pub async fn test_watch_reports_status_update<S, F, Fut>(store: &S, seed: F)
where
    S: BookingStore,
    F: Fn(Booking) -> Fut,
    Fut: Future<Output = ()>,
{
    let booking = make_booking(1000.0);
    seed(booking.clone()).await;

    let mut feed = store.watch().await.expect("watch should succeed");
    store
        .update_status(&booking.id, BookingStatus::Finished)
        .await
        .unwrap();

    let change = next_update_for(&mut feed, &booking.id).await;
    assert_eq!(change.updated_fields["status"], "finished");
    if let Some(before) = change.before {
        assert_eq!(before["status"], "pending", "pre-image should hold old status");
    }
}

pub async fn test_watch_feeds_are_independent<S, F, Fut>(store: &S, seed: F)
where
    S: BookingStore,
    F: Fn(Booking) -> Fut,
    Fut: Future<Output = ()>,
{
    let booking = make_booking(50.0);
    seed(booking.clone()).await;

    let mut first = store.watch().await.expect("watch should succeed");
    let mut second = store.watch().await.expect("watch should succeed");
    store
        .update_status(&booking.id, BookingStatus::Finished)
        .await
        .unwrap();

    next_update_for(&mut first, &booking.id).await;
    next_update_for(&mut second, &booking.id).await;
}

/// Run all BookingStore interface tests against a store implementation.
#[macro_export]
macro_rules! run_booking_store_tests {
    ($store:expr, $seed:expr) => {
        use $crate::storage::booking_store_tests::*;

        // find tests
        test_find_nonexistent($store).await;
        println!("  test_find_nonexistent: PASSED");

        test_find_existing($store, $seed).await;
        println!("  test_find_existing: PASSED");

        // list tests
        test_list_includes_seeded($store, $seed).await;
        println!("  test_list_includes_seeded: PASSED");

        // update_status tests
        test_update_status($store, $seed).await;
        println!("  test_update_status: PASSED");

        test_update_status_unknown_id($store).await;
        println!("  test_update_status_unknown_id: PASSED");

        test_hex_string_id($store, $seed).await;
        println!("  test_hex_string_id: PASSED");

        // watch tests
        test_watch_reports_status_update($store, $seed).await;
        println!("  test_watch_reports_status_update: PASSED");

        test_watch_feeds_are_independent($store, $seed).await;
        println!("  test_watch_feeds_are_independent: PASSED");
    };
}
