//! In-memory ledger store
//!
//! Behaves like a row-locking SQL store:
//! - `add_account_balance` takes the account's row lock and keeps it until
//!   the unit of work commits, rolls back or is dropped. A second unit of
//!   work touching the same account waits for it.
//! - Writes are staged in the unit of work and published atomically on commit.
//! - Ids come from sequences; rolled-back work leaves gaps.
//!
//! The committed tables sit behind a blocking mutex that is never held
//! across an await point.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};

use crate::domain::{Account, Entry, Error, NewAccount, NewUser, Result, Transfer, User};
use crate::ports::{LedgerDirectory, LedgerStore, TransactionalStore, UnitOfWork, UserStore};

#[derive(Default)]
struct Tables {
    accounts: BTreeMap<i64, Account>,
    row_locks: HashMap<i64, Arc<RowLock<()>>>,
    transfers: Vec<Transfer>,
    entries: Vec<Entry>,
    users: BTreeMap<String, User>,
    account_seq: i64,
    transfer_seq: i64,
    entry_seq: i64,
}

impl Tables {
    fn next_id(seq: &mut i64) -> i64 {
        *seq += 1;
        *seq
    }

    fn email_taken(&self, email: &str) -> bool {
        self.users.values().any(|u| u.email == email)
    }
}

#[derive(Default)]
struct Shared {
    tables: Mutex<Tables>,
}

impl Shared {
    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| Error::database("in-memory tables poisoned"))
    }
}

/// Ledger store kept entirely in process memory
#[derive(Clone, Default)]
pub struct InMemoryLedgerStore {
    shared: Arc<Shared>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed transfer rows
    pub fn transfer_count(&self) -> Result<usize> {
        Ok(self.shared.tables()?.transfers.len())
    }

    /// Number of committed entry rows
    pub fn entry_count(&self) -> Result<usize> {
        Ok(self.shared.tables()?.entries.len())
    }
}

#[async_trait]
impl TransactionalStore for InMemoryLedgerStore {
    type UnitOfWork = MemoryUnitOfWork;

    async fn begin(&self) -> Result<MemoryUnitOfWork> {
        Ok(MemoryUnitOfWork {
            shared: Arc::clone(&self.shared),
            row_guards: BTreeMap::new(),
            transfers: Vec::new(),
            entries: Vec::new(),
            accounts: BTreeMap::new(),
            users: Vec::new(),
        })
    }
}

#[async_trait]
impl LedgerDirectory for InMemoryLedgerStore {
    async fn open_account(&self, account: &NewAccount) -> Result<Account> {
        let mut tables = self.shared.tables()?;
        let duplicate = tables
            .accounts
            .values()
            .any(|a| a.owner == account.owner && a.currency_id == account.currency_id);
        if duplicate {
            return Err(Error::constraint(format!(
                "owner {} already has an account in currency {}",
                account.owner, account.currency_id
            )));
        }

        let id = Tables::next_id(&mut tables.account_seq);
        let opened = Account::new(id, account.owner.clone(), account.currency_id);
        tables.accounts.insert(id, opened.clone());
        tables.row_locks.insert(id, Arc::new(RowLock::new(())));
        Ok(opened)
    }

    async fn get_account(&self, id: i64) -> Result<Option<Account>> {
        Ok(self.shared.tables()?.accounts.get(&id).cloned())
    }

    async fn list_accounts(&self, owner: &str, limit: i64, offset: i64) -> Result<Vec<Account>> {
        let tables = self.shared.tables()?;
        Ok(tables
            .accounts
            .values()
            .filter(|a| a.owner == owner)
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn list_entries(&self, account_id: i64) -> Result<Vec<Entry>> {
        let tables = self.shared.tables()?;
        Ok(tables
            .entries
            .iter()
            .filter(|e| e.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn list_transfers(&self, account_id: i64) -> Result<Vec<Transfer>> {
        let tables = self.shared.tables()?;
        Ok(tables
            .transfers
            .iter()
            .filter(|t| t.from_account_id == account_id || t.to_account_id == account_id)
            .cloned()
            .collect())
    }

    async fn get_user(&self, username: &str) -> Result<Option<User>> {
        Ok(self.shared.tables()?.users.get(username).cloned())
    }
}

/// Unit of work over [`InMemoryLedgerStore`]
pub struct MemoryUnitOfWork {
    shared: Arc<Shared>,
    row_guards: BTreeMap<i64, OwnedMutexGuard<()>>,
    transfers: Vec<Transfer>,
    entries: Vec<Entry>,
    /// Post-update snapshots of every account this unit of work touched
    accounts: BTreeMap<i64, Account>,
    users: Vec<User>,
}

impl MemoryUnitOfWork {
    async fn lock_row(&mut self, account_id: i64) -> Result<()> {
        if self.row_guards.contains_key(&account_id) {
            return Ok(());
        }
        let lock = self
            .shared
            .tables()?
            .row_locks
            .get(&account_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("account {}", account_id)))?;

        let guard = lock.lock_owned().await;
        self.row_guards.insert(account_id, guard);
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryUnitOfWork {
    async fn create_transfer(
        &mut self,
        from_account_id: i64,
        to_account_id: i64,
        amount: i64,
    ) -> Result<Transfer> {
        if from_account_id == to_account_id {
            return Err(Error::constraint("transfers_check: from and to accounts must differ"));
        }
        if amount <= 0 {
            return Err(Error::constraint("transfers_amount_check: amount must be positive"));
        }

        let id = Tables::next_id(&mut self.shared.tables()?.transfer_seq);
        let transfer = Transfer::new(id, from_account_id, to_account_id, amount);
        self.transfers.push(transfer.clone());
        Ok(transfer)
    }

    async fn create_entry(&mut self, account_id: i64, amount: i64) -> Result<Entry> {
        let id = Tables::next_id(&mut self.shared.tables()?.entry_seq);
        let entry = Entry::new(id, account_id, amount);
        self.entries.push(entry.clone());
        Ok(entry)
    }

    async fn add_account_balance(&mut self, account_id: i64, delta: i64) -> Result<Account> {
        self.lock_row(account_id).await?;

        // Read only after the row lock is held, so no committed delta is missed.
        let current = match self.accounts.get(&account_id) {
            Some(staged) => staged.clone(),
            None => self
                .shared
                .tables()?
                .accounts
                .get(&account_id)
                .cloned()
                .ok_or_else(|| Error::not_found(format!("account {}", account_id)))?,
        };

        let balance = current.checked_balance_after(delta).ok_or_else(|| {
            Error::constraint(format!(
                "balance of account {} out of range after adding {}",
                account_id, delta
            ))
        })?;

        let updated = Account { balance, ..current };
        self.accounts.insert(account_id, updated.clone());
        Ok(updated)
    }
}

#[async_trait]
impl UserStore for MemoryUnitOfWork {
    async fn create_user(&mut self, user: NewUser) -> Result<User> {
        {
            let tables = self.shared.tables()?;
            let staged_clash = self
                .users
                .iter()
                .any(|u| u.username == user.username || u.email == user.email);
            if tables.users.contains_key(&user.username) || staged_clash {
                return Err(Error::constraint(format!(
                    "users_pkey: username {} already exists",
                    user.username
                )));
            }
            if tables.email_taken(&user.email) {
                return Err(Error::constraint(format!(
                    "users_email_key: email {} already registered",
                    user.email
                )));
            }
        }

        let created = user.into_user();
        self.users.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(mut self) -> Result<()> {
        let mut tables = self.shared.tables()?;

        // Users are not row-locked; recheck uniqueness against concurrent commits.
        for user in &self.users {
            if tables.users.contains_key(&user.username) || tables.email_taken(&user.email) {
                return Err(Error::constraint(format!(
                    "users_pkey: username {} already exists",
                    user.username
                )));
            }
        }

        for (id, staged) in &self.accounts {
            match tables.accounts.get_mut(id) {
                Some(account) => account.balance = staged.balance,
                None => return Err(Error::not_found(format!("account {}", id))),
            }
        }
        tables.transfers.append(&mut self.transfers);
        tables.entries.append(&mut self.entries);
        for user in self.users.drain(..) {
            tables.users.insert(user.username.clone(), user);
        }

        drop(tables);
        // Row guards are released when `self` goes out of scope.
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    async fn two_accounts(store: &InMemoryLedgerStore) -> (i64, i64) {
        let a = store.open_account(&NewAccount::new("alice", 1)).await.unwrap();
        let b = store.open_account(&NewAccount::new("bob", 1)).await.unwrap();
        (a.id, b.id)
    }

    #[tokio::test]
    async fn test_writes_invisible_until_commit() {
        let store = InMemoryLedgerStore::new();
        let (a, b) = two_accounts(&store).await;

        let mut uow = store.begin().await.unwrap();
        uow.create_transfer(a, b, 10).await.unwrap();
        uow.create_entry(a, -10).await.unwrap();
        let staged = uow.add_account_balance(a, -10).await.unwrap();
        assert_eq!(staged.balance, -10);

        assert_eq!(store.transfer_count().unwrap(), 0);
        assert_eq!(store.get_account(a).await.unwrap().unwrap().balance, 0);

        uow.commit().await.unwrap();
        assert_eq!(store.transfer_count().unwrap(), 1);
        assert_eq!(store.entry_count().unwrap(), 1);
        assert_eq!(store.get_account(a).await.unwrap().unwrap().balance, -10);
    }

    #[tokio::test]
    async fn test_missing_account_is_not_found() {
        let store = InMemoryLedgerStore::new();
        let mut uow = store.begin().await.unwrap();
        let err = uow.add_account_balance(99, 5).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_row_lock_blocks_second_writer_until_release() {
        let store = InMemoryLedgerStore::new();
        let (a, _) = two_accounts(&store).await;

        let mut first = store.begin().await.unwrap();
        first.add_account_balance(a, 5).await.unwrap();

        let mut second = store.begin().await.unwrap();
        let blocked =
            tokio::time::timeout(Duration::from_millis(50), second.add_account_balance(a, 1)).await;
        assert!(blocked.is_err(), "second writer should wait for the row lock");

        first.commit().await.unwrap();
        let after = second.add_account_balance(a, 1).await.unwrap();
        assert_eq!(after.balance, 6);
        second.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_dropped_unit_of_work_discards_and_unlocks() {
        let store = InMemoryLedgerStore::new();
        let (a, b) = two_accounts(&store).await;

        {
            let mut uow = store.begin().await.unwrap();
            uow.create_transfer(a, b, 3).await.unwrap();
            uow.add_account_balance(a, -3).await.unwrap();
        }

        let mut uow = store.begin().await.unwrap();
        let account = uow.add_account_balance(a, 1).await.unwrap();
        assert_eq!(account.balance, 1);
        uow.rollback().await.unwrap();
        assert_eq!(store.transfer_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_balance_overflow_is_constraint() {
        let store = InMemoryLedgerStore::new();
        let (a, _) = two_accounts(&store).await;

        let mut uow = store.begin().await.unwrap();
        uow.add_account_balance(a, i64::MAX).await.unwrap();
        let err = uow.add_account_balance(a, 1).await.unwrap_err();
        assert!(matches!(err, Error::Constraint(_)));
    }

    #[tokio::test]
    async fn test_transfer_row_checks() {
        let store = InMemoryLedgerStore::new();
        let mut uow = store.begin().await.unwrap();
        assert!(matches!(
            uow.create_transfer(1, 1, 5).await.unwrap_err(),
            Error::Constraint(_)
        ));
        assert!(matches!(
            uow.create_transfer(1, 2, 0).await.unwrap_err(),
            Error::Constraint(_)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_owner_currency_rejected() {
        let store = InMemoryLedgerStore::new();
        store.open_account(&NewAccount::new("alice", 1)).await.unwrap();
        let err = store
            .open_account(&NewAccount::new("alice", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Constraint(_)));
        assert!(store.open_account(&NewAccount::new("alice", 2)).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_accounts_pages_by_id() {
        let store = InMemoryLedgerStore::new();
        for currency in 1..=4 {
            store
                .open_account(&NewAccount::new("carol", currency))
                .await
                .unwrap();
        }
        let page = store.list_accounts("carol", 2, 1).await.unwrap();
        let ids: Vec<i64> = page.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }
}
