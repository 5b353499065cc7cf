pub mod traits;

#[cfg(feature = "clickhouse")]
pub mod clickhouse;
