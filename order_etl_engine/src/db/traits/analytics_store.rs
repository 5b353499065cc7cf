use std::{fmt::Display, future::Future};

use crate::db_types::{LineItemRecord, OrderRecord};

/// The two relations written by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreTable {
    /// Keyed by `(id, created_at)`, replace-on-duplicate.
    Orders,
    /// Keyed by `(id, order_id)`, replace-on-duplicate.
    OrderItems,
}

impl StoreTable {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::OrderItems => "order_items",
        }
    }
}

impl Display for StoreTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// This trait defines the behaviour a columnar store must expose in order to receive order data from the engine.
///
/// Each insert call is a single bulk insert. Splitting large batches into chunks is the loader's job, so a backend can
/// assume that it is handed at most `batch_size` rows at a time.
///
/// Duplicate rows are expected. Backends hold rows under replace-on-duplicate semantics and collapse them when
/// [`AnalyticsStore::optimize`] is called, or in their own time.
pub trait AnalyticsStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Insert a chunk of order rows into the `orders` relation.
    fn insert_orders(&self, rows: &[OrderRecord]) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Insert a chunk of line item rows into the `order_items` relation.
    fn insert_order_items(&self, rows: &[LineItemRecord]) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Ask the store to merge parts of the given table now, collapsing rows that share a key.
    fn optimize(&self, table: StoreTable) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// The number of logical rows in the table, i.e. after duplicate keys have been collapsed.
    fn count_rows(&self, table: StoreTable) -> impl Future<Output = Result<u64, Self::Error>> + Send;
}
