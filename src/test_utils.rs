//! Test utilities and mock implementations.
//!
//! Mock tax calculator for exercising the watcher without an HTTP service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::RwLock;

use crate::booking::Booking;
use crate::handlers::broadcast::{BroadcastMessage, Subscription};
use crate::handlers::calculator::GstBreakdown;
use crate::interfaces::{EnrichmentError, GstDetails, TaxCalculator};

/// Mock tax calculator that records every amount it is asked about.
///
/// Answers with the standard 9% + 9% breakdown unless told to fail.
#[derive(Default)]
pub struct MockTaxCalculator {
    amounts: RwLock<Vec<f64>>,
    failure: RwLock<Option<EnrichmentError>>,
    response: RwLock<Option<GstDetails>>,
    delay: RwLock<Option<Duration>>,
}

impl MockTaxCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a calculator that always fails with the given error.
    pub fn failing(error: EnrichmentError) -> Self {
        Self {
            failure: RwLock::new(Some(error)),
            ..Self::default()
        }
    }

    /// Create a calculator that always answers with `details`.
    pub fn returning(details: GstDetails) -> Self {
        Self {
            response: RwLock::new(Some(details)),
            ..Self::default()
        }
    }

    /// Make every call take at least `delay`.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    /// Amounts passed to `compute_tax`, in call order.
    pub async fn amounts(&self) -> Vec<f64> {
        self.amounts.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.amounts.read().await.len()
    }
}

#[async_trait]
impl TaxCalculator for MockTaxCalculator {
    async fn compute_tax(&self, amount: f64) -> Result<GstDetails, EnrichmentError> {
        self.amounts.write().await.push(amount);

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.failure.read().await.clone() {
            return Err(error);
        }
        if let Some(details) = self.response.read().await.clone() {
            return Ok(details);
        }
        Ok(json!(GstBreakdown::for_amount(amount)))
    }
}

pub fn pending(id: &str, amount: f64) -> Booking {
    Booking::new(id, format!("Guest {}", id), amount, crate::booking::BookingStatus::Pending)
}

pub fn finished(id: &str, amount: f64) -> Booking {
    Booking::new(id, format!("Guest {}", id), amount, crate::booking::BookingStatus::Finished)
}

/// Wait for the next message, failing the test after two seconds.
pub async fn next_message(subscription: &mut Subscription) -> Arc<BroadcastMessage> {
    tokio::time::timeout(Duration::from_secs(2), subscription.recv())
        .await
        .expect("timed out waiting for broadcast")
        .expect("broadcaster closed")
}

/// Assert nothing arrives within a short window.
pub async fn assert_quiet(subscription: &mut Subscription) {
    let waited = tokio::time::timeout(Duration::from_millis(150), subscription.recv()).await;
    assert!(waited.is_err(), "unexpected broadcast: {:?}", waited);
}
