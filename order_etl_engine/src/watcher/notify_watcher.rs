use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc,
        Arc,
        Mutex,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use glob::Pattern;
use log::*;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::watcher::{EnvelopeCallback, FileHandler, FileWatcher, RetryPolicy, WatcherError};

const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(250);

struct ActiveWatch {
    watcher: RecommendedWatcher,
    running: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

/// Watches a single directory (not its subdirectories) for newly created files whose names match a glob pattern.
///
/// Filesystem events are consumed on a dedicated thread. Each new file is read there, synchronously, so a file that
/// needs several read attempts holds up the files behind it.
pub struct NotifyFileWatcher {
    directory: PathBuf,
    pattern: Pattern,
    handler: Arc<FileHandler>,
    active: Mutex<Option<ActiveWatch>>,
}

impl std::fmt::Debug for NotifyFileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NotifyFileWatcher({}, {})", self.directory.display(), self.pattern)
    }
}

impl NotifyFileWatcher {
    pub fn new<P: AsRef<Path>>(directory: P, file_pattern: &str, retry: RetryPolicy) -> Result<Self, WatcherError> {
        let pattern = Pattern::new(file_pattern)
            .map_err(|e| WatcherError::InvalidPattern { pattern: file_pattern.to_string(), message: e.to_string() })?;
        Ok(Self {
            directory: directory.as_ref().to_path_buf(),
            pattern,
            handler: Arc::new(FileHandler::new(retry)),
            active: Mutex::new(None),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn handler(&self) -> &FileHandler {
        &self.handler
    }

    pub fn is_running(&self) -> bool {
        self.active.lock().map(|a| a.is_some()).unwrap_or(false)
    }
}

fn handle_event(event: Event, pattern: &Pattern, handler: &FileHandler, callback: &EnvelopeCallback) {
    if !matches!(event.kind, EventKind::Create(_)) {
        return;
    }
    for path in event.paths {
        if path.is_dir() {
            continue;
        }
        let matched = path.file_name().map(|n| pattern.matches(&n.to_string_lossy())).unwrap_or(false);
        if !matched {
            trace!("📂️ Ignoring {}", path.display());
            continue;
        }
        if let Err(e) = handler.process_file(&path, callback) {
            error!("📂️ Error processing file {}: {e}", path.display());
        }
    }
}

impl FileWatcher for NotifyFileWatcher {
    fn start(&self, callback: EnvelopeCallback) -> Result<(), WatcherError> {
        let mut active = match self.active.lock() {
            Ok(a) => a,
            Err(e) => e.into_inner(),
        };
        if active.is_some() {
            debug!("📂️ Already watching {}", self.directory.display());
            return Ok(());
        }
        let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
        let mut watcher = notify::recommended_watcher(tx)?;
        watcher.watch(&self.directory, RecursiveMode::NonRecursive)?;
        let running = Arc::new(AtomicBool::new(true));
        let thread = {
            let running = Arc::clone(&running);
            let handler = Arc::clone(&self.handler);
            let pattern = self.pattern.clone();
            thread::Builder::new()
                .name("order-file-watcher".into())
                .spawn(move || {
                    while running.load(Ordering::SeqCst) {
                        match rx.recv_timeout(EVENT_POLL_INTERVAL) {
                            Ok(Ok(event)) => handle_event(event, &pattern, &handler, &callback),
                            Ok(Err(e)) => error!("📂️ Filesystem watch error: {e}"),
                            Err(mpsc::RecvTimeoutError::Timeout) => {},
                            Err(mpsc::RecvTimeoutError::Disconnected) => break,
                        }
                    }
                    debug!("📂️ Watcher thread has shut down");
                })
                .map_err(WatcherError::ThreadSpawn)?
        };
        *active = Some(ActiveWatch { watcher, running, thread });
        info!("📂️ Watching {} for new '{}' files", self.directory.display(), self.pattern);
        Ok(())
    }

    fn stop(&self) {
        let watch = match self.active.lock() {
            Ok(mut a) => a.take(),
            Err(e) => e.into_inner().take(),
        };
        let Some(ActiveWatch { mut watcher, running, thread }) = watch else {
            debug!("📂️ Watcher is not running");
            return;
        };
        running.store(false, Ordering::SeqCst);
        if let Err(e) = watcher.unwatch(&self.directory) {
            warn!("📂️ Could not remove the watch on {}. {e}", self.directory.display());
        }
        drop(watcher);
        if thread.join().is_err() {
            error!("📂️ Watcher thread panicked");
        }
        info!("📂️ Stopped watching {}", self.directory.display());
    }
}

impl Drop for NotifyFileWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}
