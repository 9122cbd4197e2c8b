//! Directory port - account opening and read-side lookups
//!
//! These operations run outside any unit of work and see committed state only.

use async_trait::async_trait;

use crate::domain::{Account, Entry, NewAccount, Result, Transfer, User};

#[async_trait]
pub trait LedgerDirectory: Send + Sync {
    // === Accounts ===

    /// Open an account with a zero balance
    async fn open_account(&self, account: &NewAccount) -> Result<Account>;

    /// Get account by ID
    async fn get_account(&self, id: i64) -> Result<Option<Account>>;

    /// Accounts of one owner, ordered by id
    async fn list_accounts(&self, owner: &str, limit: i64, offset: i64) -> Result<Vec<Account>>;

    // === Ledger history ===

    /// Entries of one account, oldest first
    async fn list_entries(&self, account_id: i64) -> Result<Vec<Entry>>;

    /// Transfers where the account is either side, oldest first
    async fn list_transfers(&self, account_id: i64) -> Result<Vec<Transfer>>;

    // === Users ===

    async fn get_user(&self, username: &str) -> Result<Option<User>>;
}
