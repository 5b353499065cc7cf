use thiserror::Error;

use crate::{
    etl::errors::{ExtractError, LoadError},
    watcher::WatcherError,
};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Bulk extraction failed. {0}")]
    Extract(#[from] ExtractError),
    #[error("Bulk load failed. {0}")]
    Load(#[from] LoadError),
    #[error("Could not start the file watcher. {0}")]
    Watcher(#[from] WatcherError),
}
