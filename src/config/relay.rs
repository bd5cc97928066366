//! Enrichment and watcher configuration types.

use std::time::Duration;

use serde::Deserialize;

use crate::handlers::broadcast::DEFAULT_OBSERVER_BUFFER;

/// GST service configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Full URL of the GST calculation endpoint.
    pub url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Retries after a transport failure or timeout (0 = single attempt).
    pub max_retries: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000/calculate_gst".to_string(),
            timeout_secs: 10,
            max_retries: 0,
        }
    }
}

impl EnrichmentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Change feed processing configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Number of processing lanes. Changes to one booking always share a lane.
    pub lanes: usize,
    /// Buffered changes per lane before the feed reader waits.
    pub lane_capacity: usize,
    /// Buffered messages per observer before messages are dropped for it.
    pub observer_buffer: usize,
    /// First delay before re-opening a lost change feed, in milliseconds.
    pub reconnect_min_delay_ms: u64,
    /// Upper bound on the delay between re-open attempts, in milliseconds.
    pub reconnect_max_delay_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            lanes: 1,
            lane_capacity: 64,
            observer_buffer: DEFAULT_OBSERVER_BUFFER,
            reconnect_min_delay_ms: 100,
            reconnect_max_delay_ms: 30_000,
        }
    }
}

impl WatcherConfig {
    pub fn reconnect_min_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_min_delay_ms)
    }

    pub fn reconnect_max_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_delay_ms)
    }
}
