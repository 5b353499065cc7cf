//! Composition of the ETL stages into something that can be run.
//!
//! [`OrderProcessor`] drives one batch of raw orders through extract, transform and load. [`EtlPipeline`] wires the
//! processor to an event queue and a file watcher, and runs the startup bulk pass over existing files.
mod errors;
mod etl_pipeline;
mod order_processor;

pub use errors::PipelineError;
pub use etl_pipeline::{BulkSummary, EtlPipeline, PipelineConfig};
pub use order_processor::{BatchReport, OrderProcessor};
