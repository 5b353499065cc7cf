use std::{
    collections::HashSet,
    hash::Hash,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use thiserror::Error;

use crate::{
    db::traits::{AnalyticsStore, StoreTable},
    db_types::{LineItemRecord, OrderRecord},
};

#[derive(Debug, Clone, Error)]
pub enum MemoryStoreError {
    #[error("Injected failure on {table} insert call #{call}")]
    InjectedInsertFailure { table: StoreTable, call: usize },
    #[error("Injected failure while optimizing {0}")]
    InjectedOptimizeFailure(StoreTable),
}

#[derive(Debug, Default)]
struct State {
    order_calls: Vec<usize>,
    item_calls: Vec<usize>,
    orders: Vec<OrderRecord>,
    items: Vec<LineItemRecord>,
    optimize_calls: Vec<StoreTable>,
    fail_order_call: Option<usize>,
    fail_item_call: Option<usize>,
    fail_optimize: bool,
    insert_delay: Option<Duration>,
}

/// An [`AnalyticsStore`] that keeps rows in memory and records every call made against it.
///
/// Rows accumulate (duplicates included) until [`AnalyticsStore::optimize`] is called, which keeps only the last row
/// written for each key. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("MemoryStore mutex poisoned")
    }

    /// Make the `n`th (1-based) insert call against `orders` fail.
    pub fn fail_order_insert_on_call(&self, n: usize) -> &Self {
        self.state().fail_order_call = Some(n);
        self
    }

    /// Make the `n`th (1-based) insert call against `order_items` fail.
    pub fn fail_item_insert_on_call(&self, n: usize) -> &Self {
        self.state().fail_item_call = Some(n);
        self
    }

    pub fn fail_optimize(&self) -> &Self {
        self.state().fail_optimize = true;
        self
    }

    /// Every insert call sleeps for `delay` before returning.
    pub fn with_insert_delay(&self, delay: Duration) -> &Self {
        self.state().insert_delay = Some(delay);
        self
    }

    /// The number of rows passed to each `orders` insert call, failed calls included.
    pub fn order_insert_calls(&self) -> Vec<usize> {
        self.state().order_calls.clone()
    }

    /// The number of rows passed to each `order_items` insert call, failed calls included.
    pub fn item_insert_calls(&self) -> Vec<usize> {
        self.state().item_calls.clone()
    }

    pub fn optimize_calls(&self) -> Vec<StoreTable> {
        self.state().optimize_calls.clone()
    }

    /// All order rows currently held, including not-yet-collapsed duplicates.
    pub fn orders(&self) -> Vec<OrderRecord> {
        self.state().orders.clone()
    }

    pub fn items(&self) -> Vec<LineItemRecord> {
        self.state().items.clone()
    }

    async fn delay(&self) {
        let delay = self.state().insert_delay;
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
    }
}

/// Keeps the last row for every key, preserving the order in which those rows were written.
fn collapse<T, K: Eq + Hash>(rows: &mut Vec<T>, key: impl Fn(&T) -> K) {
    let mut seen = HashSet::new();
    let mut kept = rows.drain(..).rev().filter(|r| seen.insert(key(r))).collect::<Vec<_>>();
    kept.reverse();
    *rows = kept;
}

fn distinct<T, K: Eq + Hash>(rows: &[T], key: impl Fn(&T) -> K) -> u64 {
    rows.iter().map(key).collect::<HashSet<_>>().len() as u64
}

impl AnalyticsStore for MemoryStore {
    type Error = MemoryStoreError;

    async fn insert_orders(&self, rows: &[OrderRecord]) -> Result<(), Self::Error> {
        self.delay().await;
        let mut state = self.state();
        state.order_calls.push(rows.len());
        let call = state.order_calls.len();
        if state.fail_order_call == Some(call) {
            return Err(MemoryStoreError::InjectedInsertFailure { table: StoreTable::Orders, call });
        }
        state.orders.extend_from_slice(rows);
        Ok(())
    }

    async fn insert_order_items(&self, rows: &[LineItemRecord]) -> Result<(), Self::Error> {
        self.delay().await;
        let mut state = self.state();
        state.item_calls.push(rows.len());
        let call = state.item_calls.len();
        if state.fail_item_call == Some(call) {
            return Err(MemoryStoreError::InjectedInsertFailure { table: StoreTable::OrderItems, call });
        }
        state.items.extend_from_slice(rows);
        Ok(())
    }

    async fn optimize(&self, table: StoreTable) -> Result<(), Self::Error> {
        let mut state = self.state();
        state.optimize_calls.push(table);
        if state.fail_optimize {
            return Err(MemoryStoreError::InjectedOptimizeFailure(table));
        }
        match table {
            StoreTable::Orders => collapse(&mut state.orders, OrderRecord::key),
            StoreTable::OrderItems => collapse(&mut state.items, LineItemRecord::key),
        }
        Ok(())
    }

    async fn count_rows(&self, table: StoreTable) -> Result<u64, Self::Error> {
        let state = self.state();
        let count = match table {
            StoreTable::Orders => distinct(&state.orders, OrderRecord::key),
            StoreTable::OrderItems => distinct(&state.items, LineItemRecord::key),
        };
        Ok(count)
    }
}
