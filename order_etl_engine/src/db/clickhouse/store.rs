use std::fmt::Debug;

use clickhouse::Client;
use etl_common::Secret;
use log::*;

use super::{
    schema::{CREATE_ORDERS_TABLE, CREATE_ORDER_ITEMS_TABLE},
    ClickHouseStoreError,
    OrderItemRow,
    OrderRow,
};
use crate::{
    db::traits::{AnalyticsStore, StoreTable},
    db_types::{LineItemRecord, OrderRecord},
};

#[derive(Debug, Clone)]
pub struct ClickHouseConfig {
    /// HTTP endpoint of the server, e.g. "http://127.0.0.1:8123"
    pub url: String,
    pub user: String,
    pub password: Secret<String>,
    pub database: String,
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8123".to_string(),
            user: "default".to_string(),
            password: Secret::default(),
            database: "default".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct ClickHouseStore {
    client: Client,
    config: ClickHouseConfig,
}

impl Debug for ClickHouseStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ClickHouseStore ({}/{})", self.config.url, self.config.database)
    }
}

impl ClickHouseStore {
    pub fn new(config: ClickHouseConfig) -> Self {
        let client = Client::default()
            .with_url(&config.url)
            .with_user(&config.user)
            .with_password(config.password.reveal())
            .with_database(&config.database);
        info!("🗃️ ClickHouse store configured: url={} database={} user={}", config.url, config.database, config.user);
        Self { client, config }
    }

    pub fn config(&self) -> &ClickHouseConfig {
        &self.config
    }

    /// Creates the `orders` and `order_items` tables if they do not exist yet. Existing tables are left untouched.
    pub async fn ensure_schema(&self) -> Result<(), ClickHouseStoreError> {
        self.client.query(CREATE_ORDERS_TABLE).execute().await?;
        self.client.query(CREATE_ORDER_ITEMS_TABLE).execute().await?;
        debug!("🗃️ ClickHouse tables are in place");
        Ok(())
    }
}

impl AnalyticsStore for ClickHouseStore {
    type Error = ClickHouseStoreError;

    async fn insert_orders(&self, rows: &[OrderRecord]) -> Result<(), Self::Error> {
        if rows.is_empty() {
            return Ok(());
        }
        // Convert up front so that a bad row aborts the chunk before anything is sent
        let rows = rows.iter().map(OrderRow::try_from).collect::<Result<Vec<_>, _>>()?;
        let mut insert = self.client.insert::<OrderRow>(StoreTable::Orders.name())?;
        for row in &rows {
            insert.write(row).await?;
        }
        insert.end().await?;
        trace!("🗃️ Inserted {} rows into orders", rows.len());
        Ok(())
    }

    async fn insert_order_items(&self, rows: &[LineItemRecord]) -> Result<(), Self::Error> {
        if rows.is_empty() {
            return Ok(());
        }
        let rows = rows.iter().map(OrderItemRow::try_from).collect::<Result<Vec<_>, _>>()?;
        let mut insert = self.client.insert::<OrderItemRow>(StoreTable::OrderItems.name())?;
        for row in &rows {
            insert.write(row).await?;
        }
        insert.end().await?;
        trace!("🗃️ Inserted {} rows into order_items", rows.len());
        Ok(())
    }

    async fn optimize(&self, table: StoreTable) -> Result<(), Self::Error> {
        let sql = format!("OPTIMIZE TABLE {table} FINAL");
        self.client.query(&sql).execute().await?;
        Ok(())
    }

    async fn count_rows(&self, table: StoreTable) -> Result<u64, Self::Error> {
        let sql = format!("SELECT count() FROM {table} FINAL");
        let count = self.client.query(&sql).fetch_one::<u64>().await?;
        Ok(count)
    }
}
