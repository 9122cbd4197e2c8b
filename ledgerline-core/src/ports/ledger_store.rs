//! Ledger store port - the write side used by transfers

use async_trait::async_trait;

use crate::domain::{Account, Entry, NewUser, Result, Transfer, User};

/// Row-level writes a transfer is composed of
///
/// Each call is a single atomic statement at the store level. In particular
/// `add_account_balance` is one read-modify-write executed by the store, so
/// callers never read a balance and write it back themselves.
#[async_trait]
pub trait LedgerStore: Send {
    /// Insert a transfer row
    async fn create_transfer(
        &mut self,
        from_account_id: i64,
        to_account_id: i64,
        amount: i64,
    ) -> Result<Transfer>;

    /// Insert one entry row
    async fn create_entry(&mut self, account_id: i64, amount: i64) -> Result<Entry>;

    /// Add `delta` to the balance and return the updated row.
    ///
    /// Fails with `NotFound` when the account does not exist. Implementations
    /// hold the account's row lock from this call until the unit of work ends.
    async fn add_account_balance(&mut self, account_id: i64, delta: i64) -> Result<Account>;
}

/// A store handle scoped to one unit of work
///
/// Writes become visible to others only through [`UnitOfWork::commit`].
/// Dropping a handle that was neither committed nor rolled back discards its
/// writes and releases its locks.
#[async_trait]
pub trait UnitOfWork: LedgerStore + Sized {
    async fn commit(self) -> Result<()>;

    async fn rollback(self) -> Result<()>;
}

/// A store that can open units of work
#[async_trait]
pub trait TransactionalStore: Send + Sync {
    type UnitOfWork: UnitOfWork;

    async fn begin(&self) -> Result<Self::UnitOfWork>;
}

/// User inserts performed inside a unit of work
#[async_trait]
pub trait UserStore: Send {
    /// Insert a user; duplicate usernames or emails are constraint errors
    async fn create_user(&mut self, user: NewUser) -> Result<User>;
}
