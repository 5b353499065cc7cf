use std::{fmt::Debug, future::Future};

use log::*;

use crate::{
    db::traits::{AnalyticsStore, StoreTable},
    db_types::{LineItemRecord, OrderRecord},
    etl::errors::LoadError,
};

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Writes flat records to an [`AnalyticsStore`], one bulk insert per chunk of `batch_size` rows.
pub struct OrderLoader<B> {
    store: B,
}

impl<B> Debug for OrderLoader<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderLoader")
    }
}

impl<B> OrderLoader<B> {
    pub fn new(store: B) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &B {
        &self.store
    }
}

impl<B> OrderLoader<B>
where B: AnalyticsStore
{
    /// Insert the orders, then the line items.
    ///
    /// The first chunk that fails aborts the call and no further chunks are attempted. If the failure happens while
    /// inserting line items, the orders have already been written and stay written.
    pub async fn load_data(
        &self,
        orders: &[OrderRecord],
        items: &[LineItemRecord],
        batch_size: usize,
    ) -> Result<(), LoadError> {
        self.load_orders(orders, batch_size).await?;
        self.load_order_items(items, batch_size).await?;
        info!("🗃️ Loaded {} orders and {} order items", orders.len(), items.len());
        Ok(())
    }

    pub async fn load_orders(&self, orders: &[OrderRecord], batch_size: usize) -> Result<(), LoadError> {
        self.insert_chunks(StoreTable::Orders, orders, batch_size, |chunk| self.store.insert_orders(chunk)).await
    }

    pub async fn load_order_items(&self, items: &[LineItemRecord], batch_size: usize) -> Result<(), LoadError> {
        self.insert_chunks(StoreTable::OrderItems, items, batch_size, |chunk| self.store.insert_order_items(chunk)).await
    }

    async fn insert_chunks<'a, T, F, Fut>(
        &self,
        table: StoreTable,
        rows: &'a [T],
        batch_size: usize,
        insert: F,
    ) -> Result<(), LoadError>
    where
        F: Fn(&'a [T]) -> Fut,
        Fut: Future<Output = Result<(), B::Error>>,
    {
        if rows.is_empty() {
            debug!("🗃️ Nothing to insert into {table}");
            return Ok(());
        }
        let batch_size = batch_size.max(1);
        let chunks = rows.len().div_ceil(batch_size);
        for (i, chunk) in rows.chunks(batch_size).enumerate() {
            let chunk_no = i + 1;
            if let Err(e) = insert(chunk).await {
                error!("🗃️ Failed to insert chunk {chunk_no}/{chunks} ({} rows) into {table}. {e}", chunk.len());
                return Err(LoadError::InsertFailed { table, chunk: chunk_no, chunks, source: Box::new(e) });
            }
            trace!("🗃️ Inserted chunk {chunk_no}/{chunks} ({} rows) into {table}", chunk.len());
        }
        debug!("🗃️ Inserted {} rows into {table} in {chunks} chunks", rows.len());
        self.compact(table).await;
        Ok(())
    }

    /// Collapse duplicate keys now rather than whenever the store gets round to it. Failure is harmless.
    async fn compact(&self, table: StoreTable) {
        match self.store.optimize(table).await {
            Ok(()) => trace!("🗃️ Optimized {table}"),
            Err(e) => warn!("🗃️ Could not optimize {table}. Duplicate rows will be merged later. {e}"),
        }
    }
}
