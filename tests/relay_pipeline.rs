//! End-to-end relay tests.
//!
//! Booking update through the REST API -> change feed -> watcher -> GST
//! service over HTTP -> observers. Uses the in-memory store and the
//! reference calculator on an ephemeral port, so no external services are
//! needed.
//!
//! Run with: cargo test --test relay_pipeline

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use gst_relay::clients::GstServiceClient;
use gst_relay::config::{EnrichmentConfig, WatcherConfig};
use gst_relay::handlers::{self, calculator, AppState};
use gst_relay::storage::MemoryBookingStore;
use gst_relay::{
    Booking, BookingStatus, BroadcastMessage, Broadcaster, MutationWatcher, Subscription,
};

/// Serve the reference calculator on an ephemeral port.
async fn start_calculator() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, calculator::router()).await.unwrap();
    });
    format!("http://{}/calculate_gst", addr)
}

/// A URL nothing is listening on.
async fn dead_endpoint() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/calculate_gst", addr)
}

struct Relay {
    store: Arc<MemoryBookingStore>,
    broadcaster: Arc<Broadcaster>,
    app: axum::Router,
    watcher: gst_relay::WatcherHandle,
}

async fn start_relay(gst_url: String, bookings: Vec<Booking>) -> Relay {
    let store = Arc::new(MemoryBookingStore::with_bookings(bookings));
    let broadcaster = Arc::new(Broadcaster::default());
    let client = GstServiceClient::new(&EnrichmentConfig {
        url: gst_url,
        timeout_secs: 2,
        max_retries: 0,
    })
    .unwrap();

    let watcher = MutationWatcher::new(
        store.clone(),
        Arc::new(client),
        broadcaster.clone(),
        WatcherConfig {
            lanes: 2,
            ..WatcherConfig::default()
        },
    )
    .spawn();

    for _ in 0..200 {
        if store.open_feeds() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(store.open_feeds() > 0, "watcher never opened a change feed");

    let app = handlers::router(AppState::new(store.clone(), broadcaster.clone()));
    Relay {
        store,
        broadcaster,
        app,
        watcher,
    }
}

async fn put_status(app: &axum::Router, id: &str, status: &str) -> StatusCode {
    let req = Request::builder()
        .method("PUT")
        .uri(format!("/bookings/{}", id))
        .header("content-type", "application/json")
        .body(Body::from(format!(r#"{{"status":"{}"}}"#, status)))
        .unwrap();
    app.clone().oneshot(req).await.unwrap().status()
}

async fn next(sub: &mut Subscription) -> Value {
    let message = tokio::time::timeout(Duration::from_secs(5), sub.recv())
        .await
        .expect("timed out waiting for broadcast")
        .expect("broadcaster closed");
    serde_json::to_value(message.as_ref()).unwrap()
}

async fn quiet(sub: &mut Subscription) {
    let waited = tokio::time::timeout(Duration::from_millis(300), sub.recv()).await;
    assert!(waited.is_err(), "unexpected broadcast: {:?}", waited);
}

fn booking(id: &str, amount: f64, status: BookingStatus) -> Booking {
    Booking::new(id, "Guest", amount, status)
}

#[tokio::test]
async fn test_finished_booking_is_enriched_and_broadcast() {
    let relay = start_relay(
        start_calculator().await,
        vec![booking("b-1", 1000.0, BookingStatus::Pending)],
    )
    .await;
    let mut sub = relay.broadcaster.subscribe().await;

    assert_eq!(put_status(&relay.app, "b-1", "finished").await, StatusCode::OK);

    let log = next(&mut sub).await;
    assert_eq!(log["event"], "logMessage");
    let text = log["data"]["log"].as_str().unwrap();
    assert!(text.starts_with("Booking b-1 status updated to 'finished'. GST Calculated: {"));

    let update = next(&mut sub).await;
    assert_eq!(update["event"], "bookingUpdated");
    assert_eq!(update["data"]["id"], "b-1");
    let fields = &update["data"]["updatedFields"];
    assert_eq!(fields["status"], "finished");
    assert_eq!(fields["gstDetails"]["base_amount"], 1000.0);
    assert_eq!(fields["gstDetails"]["cgst"], 90.0);
    assert_eq!(fields["gstDetails"]["sgst"], 90.0);
    assert_eq!(fields["gstDetails"]["total_gst"], 180.0);
    assert_eq!(fields["gstDetails"]["total_amount"], 1180.0);

    quiet(&mut sub).await;
    relay.watcher.shutdown().await;
}

#[tokio::test]
async fn test_reopened_booking_is_silent() {
    let relay = start_relay(
        start_calculator().await,
        vec![booking("b-1", 1000.0, BookingStatus::Finished)],
    )
    .await;
    let mut sub = relay.broadcaster.subscribe().await;

    assert_eq!(put_status(&relay.app, "b-1", "pending").await, StatusCode::OK);
    quiet(&mut sub).await;

    // The store still records the change.
    let req = Request::builder().uri("/bookings").body(Body::empty()).unwrap();
    let response = relay.app.clone().oneshot(req).await.unwrap();
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    let bookings: Vec<Booking> = serde_json::from_slice(&body).unwrap();
    assert_eq!(bookings[0].status, BookingStatus::Pending);

    relay.watcher.shutdown().await;
}

#[tokio::test]
async fn test_gst_service_down_still_notifies() {
    let relay = start_relay(
        dead_endpoint().await,
        vec![booking("b-1", 1000.0, BookingStatus::Pending)],
    )
    .await;
    let mut sub = relay.broadcaster.subscribe().await;

    assert_eq!(put_status(&relay.app, "b-1", "finished").await, StatusCode::OK);

    let log = next(&mut sub).await;
    assert_eq!(
        log["data"]["log"],
        "Booking b-1 status updated to 'finished'. GST Calculated: null"
    );
    let update = next(&mut sub).await;
    assert_eq!(update["data"]["updatedFields"]["gstDetails"], Value::Null);

    relay.watcher.shutdown().await;
}

#[tokio::test]
async fn test_every_observer_sees_the_same_sequence() {
    let relay = start_relay(
        start_calculator().await,
        vec![
            booking("b-1", 100.0, BookingStatus::Pending),
            booking("b-2", 200.0, BookingStatus::Finished),
        ],
    )
    .await;
    let mut first = relay.broadcaster.subscribe().await;
    let mut second = relay.broadcaster.subscribe().await;

    put_status(&relay.app, "b-1", "finished").await;
    // Wait for the enriched update before the next mutation.
    let mut expected = vec![next(&mut first).await, next(&mut first).await];
    put_status(&relay.app, "b-1", "pending").await;
    relay
        .store
        .inject_change(gst_relay::interfaces::RawChange::update(
            "b-2",
            serde_json::json!({"status": "pending"})
                .as_object()
                .cloned()
                .unwrap(),
            None,
        ));
    expected.push(next(&mut first).await);
    expected.push(next(&mut first).await);

    let mut seen = Vec::new();
    for _ in 0..expected.len() {
        seen.push(next(&mut second).await);
    }
    assert_eq!(seen, expected);
    assert_eq!(expected[3]["data"]["id"], "b-2");
    assert!(expected[3]["data"]["updatedFields"].get("gstDetails").is_none());

    relay.watcher.shutdown().await;
}

#[tokio::test]
async fn test_late_observer_sees_only_new_messages() {
    let relay = start_relay(
        start_calculator().await,
        vec![booking("b-1", 100.0, BookingStatus::Pending)],
    )
    .await;
    let mut early = relay.broadcaster.subscribe().await;

    put_status(&relay.app, "b-1", "finished").await;
    next(&mut early).await;
    next(&mut early).await;

    let mut late = relay.broadcaster.subscribe().await;
    quiet(&mut late).await;

    relay.watcher.shutdown().await;
}

#[tokio::test]
async fn test_disconnected_observer_is_reclaimed() {
    let relay = start_relay(start_calculator().await, vec![]).await;
    let sub = relay.broadcaster.subscribe().await;
    assert_eq!(relay.broadcaster.observer_count().await, 1);

    drop(sub);
    relay.broadcaster.publish(BroadcastMessage::log("ping")).await;
    assert_eq!(relay.broadcaster.observer_count().await, 0);

    relay.watcher.shutdown().await;
}
