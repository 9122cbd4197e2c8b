//! Ledgerline Core - double-entry ledger with atomic, deadlock-free transfers
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core ledger entities (Account, Entry, Transfer, etc.)
//! - **ports**: Trait definitions for the ledger store and task queue
//! - **services**: Business logic orchestration (transfers, units of work)
//! - **adapters**: Concrete implementations (DuckDB, in-memory, channels)

pub mod domain;
pub mod ports;
pub mod services;
pub mod adapters;
pub mod config;
pub mod migrations;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::duckdb::DuckDbLedgerStore;
use config::Config;
use services::*;

// Re-export commonly used types at crate root
pub use domain::{
    Account, Entry, Transfer, TransferParams, TransferResult, User,
};
pub use domain::result::{Error, ErrorKind, OperationResult};

/// Main context for ledger operations
///
/// This is the primary entry point for all business logic. It holds
/// the database connection, configuration, and all services.
pub struct LedgerContext {
    pub config: Config,
    pub ledger_dir: PathBuf,
    pub store: Arc<DuckDbLedgerStore>,
    pub account_service: AccountService<DuckDbLedgerStore>,
    pub transfer_service: TransferService<DuckDbLedgerStore>,
    pub user_service: UserService<DuckDbLedgerStore>,
}

impl LedgerContext {
    /// Create a new ledger context rooted at `ledger_dir`
    pub fn new(ledger_dir: &Path) -> Result<Self> {
        let config = Config::load(ledger_dir)?;
        std::fs::create_dir_all(ledger_dir)
            .with_context(|| format!("Failed to create {}", ledger_dir.display()))?;

        let db_path = config.db_path(ledger_dir);
        let store = Arc::new(
            DuckDbLedgerStore::open(&db_path)
                .with_context(|| format!("Failed to open {}", db_path.display()))?,
        );
        tracing::debug!(db = %db_path.display(), "ledger store opened");

        let account_service = AccountService::new(Arc::clone(&store));
        let transfer_service = TransferService::new(Arc::clone(&store), config.transfer_timeout());
        let user_service = UserService::new(Arc::clone(&store));

        Ok(Self {
            config,
            ledger_dir: ledger_dir.to_path_buf(),
            store,
            account_service,
            transfer_service,
            user_service,
        })
    }
}
