//! Order ETL Engine
//!
//! The engine ingests e-commerce order export files (`{"orders": [...]}`), turns them into typed records, and loads
//! them into a columnar analytical store. It is store-agnostic; a ClickHouse backend ships behind the `clickhouse`
//! feature.
//!
//! The library is divided into the following sections:
//! 1. Domain types ([`mod@db_types`]): the validated [`Order`](db_types::Order) and its nested entities, and the flat
//!    records written to the store.
//! 2. The ETL stages ([`mod@etl`]): [`OrderExtractor`], [`OrderTransformer`] and [`OrderLoader`].
//! 3. Store contracts and backends. Anything that implements [`AnalyticsStore`] can receive data.
//! 4. Plumbing for incremental ingestion: a bounded [`InMemoryEventQueue`] ([`mod@events`]) and a directory watcher
//!    ([`mod@watcher`]).
//! 5. Composition ([`mod@pipeline`]): [`OrderProcessor`] consumes queued envelopes, and [`EtlPipeline`] runs a bulk
//!    pass over existing files before starting the live watch loop.
//!
//! The engine never initialises logging. It logs through the `log` facade, so the host binary decides where the
//! records go.
mod db;

pub mod db_types;
pub mod etl;
pub mod events;
pub mod helpers;
pub mod pipeline;
pub mod watcher;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "clickhouse")]
pub use db::clickhouse::{ClickHouseConfig, ClickHouseStore, ClickHouseStoreError};
pub use db::traits::{AnalyticsStore, StoreTable};
pub use etl::{OrderExtractor, OrderLoader, OrderTransformer};
pub use events::{EventQueue, InMemoryEventQueue};
pub use pipeline::{BatchReport, BulkSummary, EtlPipeline, OrderProcessor, PipelineConfig, PipelineError};
pub use watcher::{FileWatcher, NotifyFileWatcher, RetryPolicy};
