//! The extract / transform / load stages.
//!
//! * [`OrderExtractor`] turns raw JSON payloads into validated [`Order`](crate::db_types::Order)s.
//! * [`OrderTransformer`] flattens orders into store-ready records.
//! * [`OrderLoader`] writes records to an [`AnalyticsStore`](crate::AnalyticsStore) in chunks.
//!
//! Each stage isolates failures per order: one bad order is reported and skipped, it never takes its siblings down
//! with it.
pub mod errors;
mod extractor;
mod loader;
mod transformer;

pub(crate) use extractor::envelope_orders;
pub use extractor::{OrderExtractor, OrderOutcome};
pub use loader::{OrderLoader, DEFAULT_BATCH_SIZE};
pub use transformer::OrderTransformer;
