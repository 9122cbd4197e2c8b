//! Core domain entities
//!
//! All ledger entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
mod entry;
pub mod ordering;
pub mod result;
mod transfer;
mod user;

pub use account::{Account, NewAccount};
pub use entry::Entry;
pub use ordering::{order_pair, BalanceDelta};
pub use result::{Error, ErrorKind, OperationResult, Result};
pub use transfer::{Transfer, TransferParams, TransferResult};
pub use user::{NewUser, User};
