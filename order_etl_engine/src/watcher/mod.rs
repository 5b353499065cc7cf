//! Watches the data directory for new export files and hands their contents to a callback.
//!
//! [`NotifyFileWatcher`] is the OS-level implementation. The per-file work (partial-write retries, envelope checks and
//! the already-seen set) lives in [`FileHandler`] so that it can be exercised without a live filesystem watch.
mod errors;
mod file_handler;
mod notify_watcher;

use std::sync::Arc;

pub use errors::WatcherError;
pub use file_handler::{FileHandler, RetryPolicy};
pub use notify_watcher::NotifyFileWatcher;
use serde_json::Value;

/// Receives the parsed envelope of every new export file. Called on the watcher's own thread, so it should not block.
pub type EnvelopeCallback = Arc<dyn Fn(Value) + Send + Sync>;

pub trait FileWatcher: Send + Sync {
    /// Start watching. `callback` is invoked once for every new matching file that parses as an export envelope.
    /// Starting a watcher that is already running does nothing.
    fn start(&self, callback: EnvelopeCallback) -> Result<(), WatcherError>;

    /// Remove the watch and wait for the watcher thread to exit. Stopping a stopped watcher does nothing.
    fn stop(&self);
}
