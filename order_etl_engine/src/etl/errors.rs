use std::path::PathBuf;

use etl_common::Money;
use thiserror::Error;

use crate::{db::traits::StoreTable, db_types::OrderId};

/// A single order (or one of its nested entities) failed validation. The order is skipped; its siblings are not
/// affected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Order {} is invalid. [{}] {}", display_order_id(.order_id), .context, .message)]
pub struct OrderValidationError {
    /// The order's identifier, if it could be read from the payload.
    pub order_id: Option<OrderId>,
    /// Where in the payload the problem was found, e.g. `customer.created_at` or `line_items[2]`.
    pub context: String,
    pub message: String,
}

impl OrderValidationError {
    pub fn new<C: Into<String>, M: Into<String>>(order_id: Option<OrderId>, context: C, message: M) -> Self {
        Self { order_id, context: context.into(), message: message.into() }
    }
}

fn display_order_id(id: &Option<OrderId>) -> String {
    id.map(|id| format!("#{id}")).unwrap_or_else(|| "<unknown>".to_string())
}

/// A whole input file (or event envelope) could not be used.
#[derive(Debug, Error)]
pub enum MalformedInput {
    #[error("Could not read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("{path} is not valid JSON: {source}")]
    Json { path: PathBuf, source: serde_json::Error },
    #[error("Expected a JSON object at the top level")]
    NotAnObject,
    #[error("No 'orders' key found")]
    MissingOrders,
    #[error("Expected 'orders' to be a list of orders")]
    OrdersNotASequence,
}

/// Errors that abort a bulk extraction run. Bad files and bad orders never do.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Directory {0} does not exist")]
    DirectoryMissing(PathBuf),
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),
    #[error("Could not read directory {path}: {source}")]
    Unreadable { path: PathBuf, source: std::io::Error },
    #[error("Invalid file pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// An order that cannot be represented in the store. Only the offending order is excluded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("Order #{order_id}: {field} = {amount} does not fit the store's Decimal(10,2) columns")]
    AmountOutOfRange { order_id: OrderId, field: String, amount: Money },
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to insert chunk {chunk} of {chunks} into {table}. {source}")]
    InsertFailed {
        table: StoreTable,
        /// 1-based index of the chunk that failed
        chunk: usize,
        chunks: usize,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl LoadError {
    pub fn table(&self) -> StoreTable {
        match self {
            Self::InsertFailed { table, .. } => *table,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn validation_error_names_the_order() {
        let e = OrderValidationError::new(Some(42), "customer.created_at", "'nope' is not a valid ISO-8601 timestamp");
        assert_eq!(e.to_string(), "Order #42 is invalid. [customer.created_at] 'nope' is not a valid ISO-8601 timestamp");
        let e = OrderValidationError::new(None, "order", "missing field `id`");
        assert!(e.to_string().starts_with("Order <unknown> is invalid."));
    }
}
