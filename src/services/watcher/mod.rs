//! Booking change feed watcher.
//!
//! Keeps a change feed open on the booking store and runs every update
//! through [`ChangeProcessor`]. Changes are routed onto processing lanes by
//! booking id: one booking's changes are always handled in feed order,
//! different bookings may be handled in parallel.
//!
//! A lost feed is re-opened with backoff. Changes made while the feed is
//! down are not replayed.

mod processor;

pub use processor::{ChangeEvent, ChangeProcessor, Outcome, WatchError, GST_DETAILS_FIELD};

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use backon::BackoffBuilder;
use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::WatcherConfig;
use crate::handlers::broadcast::Broadcaster;
use crate::interfaces::{BookingStore, RawChange, TaxCalculator};
use crate::utils::retry::feed_backoff;

/// Watches the booking store and drives change processing.
pub struct MutationWatcher {
    store: Arc<dyn BookingStore>,
    processor: Arc<ChangeProcessor>,
    config: WatcherConfig,
}

/// Handle to a running watcher.
pub struct WatcherHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    /// Stop watching and wait for in-flight changes to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "Watcher task failed");
        }
    }
}

/// Resolve once shutdown is requested or the handle is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Pick the lane for a booking id.
fn lane_for(id: &str, lanes: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    (hasher.finish() % lanes as u64) as usize
}

impl MutationWatcher {
    pub fn new(
        store: Arc<dyn BookingStore>,
        calculator: Arc<dyn TaxCalculator>,
        broadcaster: Arc<Broadcaster>,
        config: WatcherConfig,
    ) -> Self {
        let processor = Arc::new(ChangeProcessor::new(
            Arc::clone(&store),
            calculator,
            broadcaster,
        ));
        Self {
            store,
            processor,
            config,
        }
    }

    /// Start watching on a background task.
    pub fn spawn(self) -> WatcherHandle {
        let (shutdown, rx) = watch::channel(false);
        let task = tokio::spawn(self.run(rx));
        WatcherHandle { shutdown, task }
    }

    /// Watch until shutdown is requested.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let lane_count = self.config.lanes.max(1);
        let mut lanes = Vec::with_capacity(lane_count);
        let mut workers = Vec::with_capacity(lane_count);

        for lane in 0..lane_count {
            let (tx, mut rx) = mpsc::channel::<ChangeEvent>(self.config.lane_capacity.max(1));
            let processor = Arc::clone(&self.processor);
            workers.push(tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    let outcome = processor.process(event).await;
                    debug!(lane, ?outcome, "Change processed");
                }
            }));
            lanes.push(tx);
        }

        info!(lanes = lane_count, "Mutation watcher started");
        self.watch_with_reconnect(&lanes, &mut shutdown).await;

        // Closing the lanes lets workers drain what is already queued.
        drop(lanes);
        for worker in workers {
            if let Err(e) = worker.await {
                error!(error = %e, "Lane worker failed");
            }
        }
        info!("Mutation watcher stopped");
    }

    /// Feed loop with automatic reconnection and exponential backoff with jitter.
    async fn watch_with_reconnect(
        &self,
        lanes: &[mpsc::Sender<ChangeEvent>],
        shutdown: &mut watch::Receiver<bool>,
    ) {
        let max_delay = self.config.reconnect_max_delay();
        let backoff_builder = feed_backoff(self.config.reconnect_min_delay(), max_delay);
        let mut backoff_iter = backoff_builder.build();

        loop {
            let opened = tokio::select! {
                _ = shutdown_requested(shutdown) => return,
                opened = self.store.watch() => opened,
            };

            match opened {
                Ok(mut feed) => {
                    info!("Change feed connected");
                    // Reset backoff on successful connection
                    backoff_iter = backoff_builder.build();

                    loop {
                        let item = tokio::select! {
                            _ = shutdown_requested(shutdown) => return,
                            item = feed.next() => item,
                        };
                        match item {
                            Some(Ok(raw)) => {
                                if !Self::dispatch(raw, lanes).await {
                                    return;
                                }
                            }
                            Some(Err(e)) => {
                                warn!(error = %e, "Change feed error, will reconnect");
                                break;
                            }
                            None => {
                                info!("Change feed ended, reconnecting");
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "Failed to open change feed");
                }
            }

            let delay = backoff_iter.next().unwrap_or(max_delay);
            debug!(backoff_ms = delay.as_millis() as u64, "Waiting before reopening change feed");
            tokio::select! {
                _ = shutdown_requested(shutdown) => return,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Route a raw change to its lane. Returns false if the lanes are gone.
    async fn dispatch(raw: RawChange, lanes: &[mpsc::Sender<ChangeEvent>]) -> bool {
        debug!(
            operation = ?raw.operation,
            booking = %raw.document_id,
            "Change detected"
        );

        let Some(event) = ChangeEvent::from_raw(raw) else {
            return true;
        };

        let lane = lane_for(&event.id, lanes.len());
        if lanes[lane].send(event).await.is_err() {
            error!(lane, "Processing lane closed, stopping watcher");
            return false;
        }
        true
    }
}
