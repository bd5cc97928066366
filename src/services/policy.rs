//! Transition policy for booking status changes.
//!
//! Pure decision logic: no store access, no network, no broadcast.

use crate::booking::BookingStatus;

/// What the watcher should do with a status change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Drop the change: no log, no broadcast, no enrichment.
    Suppress,
    /// Compute GST for the amount, then notify observers.
    EnrichThenNotify { amount: f64 },
    /// Notify observers of the new status as-is.
    NotifyPlain { status: BookingStatus },
}

/// Whether a transition is a correction that must produce no output.
///
/// Needs no record data, so callers can check it before any store access.
pub fn is_suppressed(prev: Option<BookingStatus>, new: BookingStatus) -> bool {
    matches!(
        (prev, new),
        (Some(BookingStatus::Finished), BookingStatus::Pending)
    )
}

/// Decide how to handle a status transition.
///
/// Rules, first match wins:
/// 1. `finished` -> `pending` is a correction and is suppressed.
/// 2. Any transition into `finished` is enriched.
/// 3. Everything else is a plain notification.
///
/// An unknown previous status (no pre-image available) never matches rule 1.
pub fn decide(prev: Option<BookingStatus>, new: BookingStatus, amount: f64) -> Action {
    if is_suppressed(prev, new) {
        return Action::Suppress;
    }
    match (prev, new) {
        (_, BookingStatus::Finished) => Action::EnrichThenNotify { amount },
        (_, status) => Action::NotifyPlain { status },
    }
}
