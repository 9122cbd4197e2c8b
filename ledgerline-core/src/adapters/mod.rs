//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the durable ledger store
//! - Process memory for the ledger store used in tests and dry runs
//! - Tokio channels for the task distributor

pub mod channel;
pub mod duckdb;
pub mod memory;
