//! Account service - opening, lookup and listing of accounts

use std::sync::Arc;

use serde::Serialize;

use crate::domain::{Account, Entry, Error, NewAccount, Result, Transfer};
use crate::ports::LedgerDirectory;

/// Smallest page size accepted by [`AccountService::list`]
pub const MIN_PAGE_SIZE: i64 = 5;
/// Largest page size accepted by [`AccountService::list`]
pub const MAX_PAGE_SIZE: i64 = 10;

/// An account together with everything recorded against it
#[derive(Debug, Clone, Serialize)]
pub struct AccountHistory {
    pub account: Account,
    pub entries: Vec<Entry>,
    pub transfers: Vec<Transfer>,
}

/// Service for account lifecycle and read-side queries
pub struct AccountService<D> {
    directory: Arc<D>,
}

impl<D: LedgerDirectory> AccountService<D> {
    pub fn new(directory: Arc<D>) -> Self {
        Self { directory }
    }

    /// Open an account with a zero balance
    pub async fn open(&self, owner: &str, currency_id: i64) -> Result<Account> {
        let new_account = NewAccount::new(owner.trim(), currency_id);
        new_account.validate().map_err(Error::invalid_input)?;

        let account = self.directory.open_account(&new_account).await?;
        tracing::info!(
            account_id = account.id,
            owner = %account.owner,
            currency_id = account.currency_id,
            "account opened"
        );
        Ok(account)
    }

    /// Get an account, failing with NotFound when it does not exist
    pub async fn get(&self, id: i64) -> Result<Account> {
        if id < 1 {
            return Err(Error::invalid_input("account id must be positive"));
        }
        self.directory
            .get_account(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("account {}", id)))
    }

    /// One page of an owner's accounts, ordered by id
    ///
    /// `page` starts at 1; `page_size` must lie in 5..=10.
    pub async fn list(&self, owner: &str, page: i64, page_size: i64) -> Result<Vec<Account>> {
        if page < 1 {
            return Err(Error::invalid_input("page must be at least 1"));
        }
        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(Error::invalid_input(format!(
                "page size must be between {} and {}",
                MIN_PAGE_SIZE, MAX_PAGE_SIZE
            )));
        }

        let offset = (page - 1)
            .checked_mul(page_size)
            .ok_or_else(|| Error::invalid_input("page out of range"))?;
        self.directory.list_accounts(owner, page_size, offset).await
    }

    /// The account with its entries and transfers
    pub async fn history(&self, id: i64) -> Result<AccountHistory> {
        let account = self.get(id).await?;
        let entries = self.directory.list_entries(id).await?;
        let transfers = self.directory.list_transfers(id).await?;
        Ok(AccountHistory {
            account,
            entries,
            transfers,
        })
    }

    /// Check both sides of a transfer exist and are held in `currency_id`
    ///
    /// The transfer engine itself is currency agnostic; callers that take a
    /// currency with the request run this first.
    pub async fn check_transfer_accounts(
        &self,
        from_account_id: i64,
        to_account_id: i64,
        currency_id: i64,
    ) -> Result<(Account, Account)> {
        let from = self.get(from_account_id).await?;
        let to = self.get(to_account_id).await?;

        for account in [&from, &to] {
            if account.currency_id != currency_id {
                return Err(Error::invalid_input(format!(
                    "account {} currency mismatch: {} vs {}",
                    account.id, account.currency_id, currency_id
                )));
            }
        }
        Ok((from, to))
    }
}
