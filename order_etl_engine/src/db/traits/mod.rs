//! # Analytical store contracts
//!
//! The engine never talks to a particular database directly. Loading goes through the [`AnalyticsStore`] trait, which
//! is deliberately narrow: bulk inserts into the two relations, an explicit compaction trigger, and a row count for
//! reads. Aggregation and reporting are the store's business, not the engine's.
//!
//! * [`AnalyticsStore`] defines what a backend must provide.
//! * [`StoreTable`] names the two relations the engine writes to.
mod analytics_store;

pub use analytics_store::{AnalyticsStore, StoreTable};
