//! Shared helpers for ledger integration tests
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;

use ledgerline_core::adapters::memory::{InMemoryLedgerStore, MemoryUnitOfWork};
use ledgerline_core::domain::{Account, Entry, Error, NewAccount, Result, Transfer};
use ledgerline_core::ports::{LedgerDirectory, LedgerStore, TransactionalStore, UnitOfWork};
use ledgerline_core::services::run_in_transaction;

/// Open an account and give it a starting balance in its own unit of work
pub async fn open_funded<S>(store: &S, owner: &str, balance: i64) -> Account
where
    S: TransactionalStore + LedgerDirectory,
{
    let account = store
        .open_account(&NewAccount::new(owner, 1))
        .await
        .unwrap();
    if balance == 0 {
        return account;
    }
    let id = account.id;
    run_in_transaction(store, move |tx| {
        async move { tx.add_account_balance(id, balance).await }.boxed()
    })
    .await
    .unwrap()
}

pub async fn balance_of<D: LedgerDirectory>(store: &D, id: i64) -> i64 {
    store.get_account(id).await.unwrap().unwrap().balance
}

/// Faults a [`FaultyStore`] injects into every unit of work it opens
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    /// Fail the n-th balance update (1-based) of each unit of work
    pub fail_balance_update: Option<usize>,
    pub fail_commit: bool,
    pub fail_rollback: bool,
}

/// In-memory store wrapper that fails on command
#[derive(Clone)]
pub struct FaultyStore {
    inner: InMemoryLedgerStore,
    faults: Faults,
}

impl FaultyStore {
    pub fn new(inner: InMemoryLedgerStore, faults: Faults) -> Arc<Self> {
        Arc::new(Self { inner, faults })
    }
}

pub struct FaultyUnitOfWork {
    inner: MemoryUnitOfWork,
    faults: Faults,
    balance_updates: usize,
}

#[async_trait]
impl TransactionalStore for FaultyStore {
    type UnitOfWork = FaultyUnitOfWork;

    async fn begin(&self) -> Result<FaultyUnitOfWork> {
        Ok(FaultyUnitOfWork {
            inner: self.inner.begin().await?,
            faults: self.faults,
            balance_updates: 0,
        })
    }
}

#[async_trait]
impl LedgerStore for FaultyUnitOfWork {
    async fn create_transfer(&mut self, from: i64, to: i64, amount: i64) -> Result<Transfer> {
        self.inner.create_transfer(from, to, amount).await
    }

    async fn create_entry(&mut self, account_id: i64, amount: i64) -> Result<Entry> {
        self.inner.create_entry(account_id, amount).await
    }

    async fn add_account_balance(&mut self, account_id: i64, delta: i64) -> Result<Account> {
        self.balance_updates += 1;
        if self.faults.fail_balance_update == Some(self.balance_updates) {
            return Err(Error::database(format!(
                "injected failure updating account {}",
                account_id
            )));
        }
        self.inner.add_account_balance(account_id, delta).await
    }
}

#[async_trait]
impl UnitOfWork for FaultyUnitOfWork {
    async fn commit(self) -> Result<()> {
        if self.faults.fail_commit {
            // Dropping the inner unit of work discards its writes.
            return Err(Error::database("injected commit failure"));
        }
        self.inner.commit().await
    }

    async fn rollback(self) -> Result<()> {
        if self.faults.fail_rollback {
            return Err(Error::database("injected rollback failure"));
        }
        self.inner.rollback().await
    }
}
