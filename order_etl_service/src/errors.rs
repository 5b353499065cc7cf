use order_etl_engine::PipelineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Could not initialize the service. {0}")]
    InitializeError(String),
    #[error("Invalid service configuration. {0}")]
    ConfigurationError(String),
    #[error("Pipeline error. {0}")]
    PipelineError(#[from] PipelineError),
}
