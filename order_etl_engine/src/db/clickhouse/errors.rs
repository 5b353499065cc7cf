use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClickHouseStoreError {
    #[error("ClickHouse driver error: {0}")]
    DriverError(#[from] clickhouse::error::Error),
    #[error("Could not convert record into a ClickHouse row: {0}")]
    RowConversion(String),
}
