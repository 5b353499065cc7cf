use std::path::PathBuf;

use thiserror::Error;

use crate::etl::errors::MalformedInput;

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("Could not watch the directory. {0}")]
    Notify(#[from] notify::Error),
    #[error("Could not start the watcher thread. {0}")]
    ThreadSpawn(std::io::Error),
    #[error("Invalid file pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
    #[error("Could not read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("{0} is empty")]
    EmptyFile(PathBuf),
    #[error("{path} is not valid JSON: {source}")]
    Json { path: PathBuf, source: serde_json::Error },
    #[error("{path} is not a valid export file. {source}")]
    Envelope { path: PathBuf, source: MalformedInput },
}
