use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
    thread,
    time::Duration,
};

use log::*;
use serde_json::Value;

use crate::{
    etl::{envelope_orders, errors::MalformedInput},
    watcher::{EnvelopeCallback, WatcherError},
};

/// How hard to try before giving up on a file that is still being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of read attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, delay: Duration::from_millis(1000) }
    }
}

/// Reads newly created export files and passes their envelopes on, at most once per path.
#[derive(Debug, Default)]
pub struct FileHandler {
    retry: RetryPolicy,
    processed: Mutex<HashSet<PathBuf>>,
}

impl FileHandler {
    pub fn new(retry: RetryPolicy) -> Self {
        Self { retry, processed: Mutex::new(HashSet::new()) }
    }

    pub fn is_processed(&self, path: &Path) -> bool {
        let path = absolute(path);
        self.processed.lock().map(|p| p.contains(&path)).unwrap_or(false)
    }

    /// Read `path`, check its envelope and hand it to `callback`.
    ///
    /// Returns `Ok(true)` if the callback was invoked. Files that have been handled before, and files without an
    /// `orders` key, are skipped and return `Ok(false)`. Reading is retried according to the [`RetryPolicy`]; the error
    /// from the final attempt is returned.
    pub fn process_file(&self, path: &Path, callback: &EnvelopeCallback) -> Result<bool, WatcherError> {
        let path = absolute(path);
        if self.is_processed(&path) {
            debug!("📂️ {} has already been processed", path.display());
            return Ok(false);
        }
        info!("📂️ Processing new file: {}", path.display());
        let envelope = self.read_envelope(&path)?;
        match envelope_orders(&envelope) {
            Ok(orders) => debug!("📂️ {} holds {} orders", path.display(), orders.len()),
            Err(MalformedInput::MissingOrders) => {
                warn!("📂️ No 'orders' key found in {}. Skipping it.", path.display());
                return Ok(false);
            },
            Err(source) => return Err(WatcherError::Envelope { path, source }),
        }
        callback(envelope);
        if let Ok(mut processed) = self.processed.lock() {
            processed.insert(path);
        }
        Ok(true)
    }

    fn read_envelope(&self, path: &Path) -> Result<Value, WatcherError> {
        let attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match read_json(path) {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts => {
                    debug!(
                        "📂️ Attempt {attempt}/{attempts} to read {} failed. {e}. Retrying in {}ms",
                        path.display(),
                        self.retry.delay.as_millis()
                    );
                    thread::sleep(self.retry.delay);
                    attempt += 1;
                },
                Err(e) => {
                    warn!("📂️ Giving up on {} after {attempts} attempts", path.display());
                    return Err(e);
                },
            }
        }
    }
}

fn read_json(path: &Path) -> Result<Value, WatcherError> {
    let content = fs::read_to_string(path).map_err(|source| WatcherError::Io { path: path.to_path_buf(), source })?;
    if content.trim().is_empty() {
        return Err(WatcherError::EmptyFile(path.to_path_buf()));
    }
    serde_json::from_str(&content).map_err(|source| WatcherError::Json { path: path.to_path_buf(), source })
}

fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use serde_json::json;

    use super::*;
    use crate::test_utils::{envelope, write_export_file, RawOrderBuilder};

    fn counting_callback() -> (Arc<AtomicUsize>, EnvelopeCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (count, Arc::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        }))
    }

    fn fast_retries(max_attempts: u32) -> FileHandler {
        FileHandler::new(RetryPolicy { max_attempts, delay: Duration::from_millis(100) })
    }

    #[test]
    fn tolerates_a_file_written_in_two_parts() {
        let _ = env_logger::try_init();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slow.json");
        let content = serde_json::to_string(&envelope(vec![RawOrderBuilder::random_order()])).unwrap();
        let (head, _) = content.split_at(content.len() / 2);
        fs::write(&path, head).unwrap();
        let writer = {
            let path = path.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(150));
                fs::write(&path, content).unwrap();
            })
        };
        let (count, callback) = counting_callback();
        let handler = fast_retries(6);
        assert!(handler.process_file(&path, &callback).unwrap());
        writer.join().unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn incomplete_file_fails_after_the_last_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{\"orders\": [").unwrap();
        let (count, callback) = counting_callback();
        let err = fast_retries(2).process_file(&path, &callback).unwrap_err();
        assert!(matches!(err, WatcherError::Json { .. }));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn empty_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        fs::write(&path, "").unwrap();
        let (_, callback) = counting_callback();
        let err = fast_retries(1).process_file(&path, &callback).unwrap_err();
        assert!(matches!(err, WatcherError::EmptyFile(_)));
    }

    #[test]
    fn envelope_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let handler = fast_retries(1);
        let (count, callback) = counting_callback();

        let no_orders = write_export_file(dir.path(), "no_orders.json", &json!({"customers": []}));
        assert!(!handler.process_file(&no_orders, &callback).unwrap());
        assert!(!handler.is_processed(&no_orders));

        let not_a_list = write_export_file(dir.path(), "not_a_list.json", &json!({"orders": {"id": 1}}));
        let err = handler.process_file(&not_a_list, &callback).unwrap_err();
        assert!(matches!(err, WatcherError::Envelope { source: MalformedInput::OrdersNotASequence, .. }));

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn files_are_only_processed_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_export_file(dir.path(), "orders.json", &envelope(vec![RawOrderBuilder::random_order()]));
        let handler = fast_retries(1);
        let (count, callback) = counting_callback();
        assert!(handler.process_file(&path, &callback).unwrap());
        assert!(handler.is_processed(&path));
        // Same file, reached through a different path
        let indirect = dir.path().join(".").join("orders.json");
        assert!(!handler.process_file(&indirect, &callback).unwrap());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
