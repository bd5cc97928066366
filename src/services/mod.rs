//! Relay services: transition policy and the change feed watcher.

pub mod policy;
pub mod watcher;

pub use policy::{decide, is_suppressed, Action};
pub use watcher::{
    ChangeEvent, ChangeProcessor, MutationWatcher, Outcome, WatchError, WatcherHandle,
};
