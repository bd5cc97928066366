//! Per-change processing: decode, look up, apply policy, enrich, broadcast.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::booking::{BookingStatus, STATUS_FIELD};
use crate::handlers::broadcast::{BroadcastMessage, Broadcaster};
use crate::interfaces::{BookingStore, OperationKind, RawChange, StorageError, TaxCalculator};
use crate::services::policy::{decide, is_suppressed, Action};

/// Key under which GST details are attached to `updatedFields`.
pub const GST_DETAILS_FIELD: &str = "gstDetails";

/// Errors raised while processing a single change.
///
/// None of these stop the watcher; they end processing of one change.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("Booking not found: {0}")]
    RecordNotFound(String),

    #[error("Invalid status value: {0}")]
    InvalidStatus(Value),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// A decoded update to a booking.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub id: String,
    /// Fields set by the update, as reported by the store.
    pub updated_fields: Map<String, Value>,
    /// Status before the update, when the store supplied a pre-image.
    pub previous_status: Option<Value>,
    /// Status set by the update, if the update touched it.
    pub new_status: Option<Value>,
}

impl ChangeEvent {
    /// Decode a raw notification. Only updates produce an event.
    pub fn from_raw(raw: RawChange) -> Option<Self> {
        if raw.operation != OperationKind::Update {
            return None;
        }

        let new_status = raw.updated_fields.get(STATUS_FIELD).cloned();
        let previous_status = raw
            .before
            .as_ref()
            .and_then(|before| before.get(STATUS_FIELD))
            .cloned();

        Some(Self {
            id: raw.document_id,
            updated_fields: raw.updated_fields,
            previous_status,
            new_status,
        })
    }
}

/// What happened to a processed change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The update did not touch the status.
    Ignored,
    /// Dropped by the transition policy.
    Suppressed,
    /// Log and update broadcast; `enriched` is false when GST was unavailable.
    Finished { enriched: bool },
    /// Log and update broadcast without enrichment.
    Notified,
    /// The booking no longer exists.
    RecordMissing,
    /// Processing failed; a diagnostic log was broadcast.
    Failed,
}

fn parse_status(value: &Value) -> Option<BookingStatus> {
    value.as_str().and_then(|s| s.parse().ok())
}

/// Runs one change through policy, enrichment and broadcast.
pub struct ChangeProcessor {
    store: Arc<dyn BookingStore>,
    calculator: Arc<dyn TaxCalculator>,
    broadcaster: Arc<Broadcaster>,
}

impl ChangeProcessor {
    pub fn new(
        store: Arc<dyn BookingStore>,
        calculator: Arc<dyn TaxCalculator>,
        broadcaster: Arc<Broadcaster>,
    ) -> Self {
        Self {
            store,
            calculator,
            broadcaster,
        }
    }

    /// Process a change. Never fails: errors are logged and broadcast as
    /// diagnostics.
    #[tracing::instrument(name = "watcher.process", skip_all, fields(booking = %event.id))]
    pub async fn process(&self, event: ChangeEvent) -> Outcome {
        let id = event.id.clone();
        match self.try_process(event).await {
            Ok(outcome) => outcome,
            Err(WatchError::RecordNotFound(_)) => {
                warn!(booking = %id, "Booking not found, change dropped");
                self.broadcaster
                    .publish(BroadcastMessage::log(format!(
                        "Booking {} not found, change skipped",
                        id
                    )))
                    .await;
                Outcome::RecordMissing
            }
            Err(e) => {
                error!(booking = %id, error = %e, "Error processing booking");
                self.broadcaster
                    .publish(BroadcastMessage::log(format!(
                        "Error processing booking {}: {}",
                        id, e
                    )))
                    .await;
                Outcome::Failed
            }
        }
    }

    fn suppress(&self, id: &str) -> Outcome {
        info!(
            "Skipping GST calculation and log for booking {} as it was changed from 'finished' to 'pending'",
            id
        );
        Outcome::Suppressed
    }

    async fn try_process(&self, event: ChangeEvent) -> Result<Outcome, WatchError> {
        let Some(new_value) = event.new_status else {
            debug!("Update does not touch status, ignored");
            return Ok(Outcome::Ignored);
        };
        let new_status =
            parse_status(&new_value).ok_or_else(|| WatchError::InvalidStatus(new_value.clone()))?;

        let previous_status = event.previous_status.as_ref().and_then(|value| {
            let parsed = parse_status(value);
            if parsed.is_none() {
                warn!(previous = %value, "Unrecognized previous status, treating as unknown");
            }
            parsed
        });

        // Reverted bookings produce no output, even if the record is gone.
        if is_suppressed(previous_status, new_status) {
            return Ok(self.suppress(&event.id));
        }

        let booking = self
            .store
            .find(&event.id)
            .await?
            .ok_or_else(|| WatchError::RecordNotFound(event.id.clone()))?;

        match decide(previous_status, new_status, booking.total_booking_amount) {
            Action::Suppress => Ok(self.suppress(&event.id)),
            Action::EnrichThenNotify { amount } => {
                let gst_details = match self.calculator.compute_tax(amount).await {
                    Ok(details) => details,
                    Err(e) => {
                        warn!(error = %e, amount, "GST calculation failed, notifying without it");
                        Value::Null
                    }
                };
                let enriched = !gst_details.is_null();

                self.broadcaster
                    .publish(BroadcastMessage::log(format!(
                        "Booking {} status updated to '{}'. GST Calculated: {}",
                        event.id, new_status, gst_details
                    )))
                    .await;

                let mut fields = event.updated_fields;
                fields.insert(GST_DETAILS_FIELD.to_string(), gst_details);
                self.broadcaster
                    .publish(BroadcastMessage::booking_updated(event.id, fields))
                    .await;

                Ok(Outcome::Finished { enriched })
            }
            Action::NotifyPlain { status } => {
                self.broadcaster
                    .publish(BroadcastMessage::log(format!(
                        "Booking {} status updated to '{}'",
                        event.id, status
                    )))
                    .await;
                self.broadcaster
                    .publish(BroadcastMessage::booking_updated(
                        event.id,
                        event.updated_fields,
                    ))
                    .await;

                Ok(Outcome::Notified)
            }
        }
    }
}
