//! ClickHouse backend for the [`AnalyticsStore`](crate::AnalyticsStore) trait.
//!
//! Both relations use the `ReplacingMergeTree` engine, so re-loading an order simply adds a row that supersedes the old
//! one once parts are merged. `OPTIMIZE TABLE .. FINAL` forces that merge.
mod errors;
mod rows;
mod schema;
mod store;

pub use errors::ClickHouseStoreError;
pub use rows::{OrderItemRow, OrderRow};
pub use store::{ClickHouseConfig, ClickHouseStore};
