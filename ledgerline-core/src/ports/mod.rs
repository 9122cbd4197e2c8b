//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The services
//! depend only on these traits, not on concrete implementations.

mod directory;
mod ledger_store;
mod task_distributor;

pub use directory::LedgerDirectory;
pub use ledger_store::{LedgerStore, TransactionalStore, UnitOfWork, UserStore};
pub use task_distributor::{TaskDistributor, VerifyEmailPayload};
