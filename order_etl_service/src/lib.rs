//! # Order ETL service
//! This crate hosts the binary that runs the order ETL pipeline. It is responsible for:
//! * Reading the configuration from the environment.
//! * Connecting to ClickHouse and making sure the `orders` and `order_items` tables exist.
//! * Loading every export file already in the data directory.
//! * Watching the directory for new files until it is told to stop (Ctrl-C), unless running in one-shot mode.
//!
//! ## Configuration
//! The service is configured via environment variables. See [config](config/index.html) for more information.
pub mod cli;
pub mod config;
pub mod errors;
pub mod service;
