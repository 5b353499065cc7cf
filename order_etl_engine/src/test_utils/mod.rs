//! Helpers for testing code that sits on top of the engine: an in-memory store, a raw order builder and some
//! filesystem fixtures.
mod memory_store;
mod order_builder;
mod prepare_env;

pub use memory_store::{MemoryStore, MemoryStoreError};
pub use order_builder::{envelope, RawOrderBuilder};
pub use prepare_env::{prepare_test_env, random_file_name, write_export_file};
