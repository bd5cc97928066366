//! Retry utilities: backoff builders for reconnecting to external systems.
//!
//! Uses `backon` for exponential backoff with jitter.

use std::time::Duration;

use backon::ExponentialBuilder;

/// Attempts before the feed backoff stays pinned at its max delay.
const FEED_BACKOFF_STEPS: usize = 64;

/// Backoff for re-opening a lost change feed.
///
/// The iterator is finite; callers fall back to `max_delay` once it is
/// exhausted and rebuild it after a successful reconnect.
pub fn feed_backoff(min_delay: Duration, max_delay: Duration) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(min_delay)
        .with_max_delay(max_delay)
        .with_max_times(FEED_BACKOFF_STEPS)
        .with_jitter()
}

/// Backoff for connecting to the store at startup.
///
/// - Min delay: 100ms
/// - Max delay: 5s
/// - Max attempts: 30
/// - Jitter enabled
pub fn connection_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(100))
        .with_max_delay(Duration::from_secs(5))
        .with_max_times(30)
        .with_jitter()
}
