//! Transfer service - moves funds between two accounts atomically
//!
//! One transfer is five writes in a single unit of work:
//!
//! 1. the transfer row
//! 2. the debit entry for the source account
//! 3. the credit entry for the destination account
//! 4. both balance updates, smaller account id first
//!
//! The balance-update order comes from [`order_pair`] and never from the
//! direction of the request. Every concurrent transfer takes row locks in the
//! same global order, so two transfers can never wait on each other in a cycle.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::Instrument;

use crate::domain::{order_pair, BalanceDelta, Result, TransferParams, TransferResult};
use crate::ports::{LedgerStore, TransactionalStore};
use crate::services::unit_of_work::run_in_transaction_until;

/// Service executing transfers against a transactional store
pub struct TransferService<S> {
    store: Arc<S>,
    timeout: Option<Duration>,
}

impl<S: TransactionalStore> TransferService<S> {
    /// `timeout` bounds each transfer's unit of work; `None` waits forever
    pub fn new(store: Arc<S>, timeout: Option<Duration>) -> Self {
        Self { store, timeout }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Move `amount` from one account to another
    pub async fn transfer(
        &self,
        from_account_id: i64,
        to_account_id: i64,
        amount: i64,
    ) -> Result<TransferResult> {
        self.execute(TransferParams::new(from_account_id, to_account_id, amount))
            .await
    }

    /// Execute a transfer, abandoning it once the configured timeout elapses
    pub async fn execute(&self, params: TransferParams) -> Result<TransferResult> {
        match self.timeout {
            Some(timeout) => self.execute_until(params, tokio::time::sleep(timeout)).await,
            None => self.execute_until(params, std::future::pending()).await,
        }
    }

    /// Execute a transfer, abandoning it when `cancel` resolves
    ///
    /// Invalid requests are rejected before a unit of work is opened, so they
    /// perform no writes at all.
    pub async fn execute_until<C>(&self, params: TransferParams, cancel: C) -> Result<TransferResult>
    where
        C: Future<Output = ()> + Send,
    {
        let span = tracing::info_span!(
            "transfer",
            from = params.from_account_id,
            to = params.to_account_id,
            amount = params.amount,
        );

        async move {
            if let Err(e) = params.validate() {
                tracing::warn!(error = %e, "transfer rejected");
                return Err(e);
            }

            let result = run_in_transaction_until(self.store.as_ref(), cancel, move |tx| {
                apply_transfer(tx, params).boxed()
            })
            .await;

            match &result {
                Ok(done) => tracing::info!(
                    transfer_id = done.transfer.id,
                    from_balance = done.from_account.balance,
                    to_balance = done.to_account.balance,
                    "transfer committed"
                ),
                Err(e) => tracing::warn!(error = %e, kind = ?e.kind(), "transfer failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

/// Issue the five writes of one transfer on a unit-of-work handle
///
/// The caller owns the unit of work; any error here must lead to rollback.
pub async fn apply_transfer<L>(tx: &mut L, params: TransferParams) -> Result<TransferResult>
where
    L: LedgerStore + ?Sized,
{
    params.validate()?;
    let TransferParams {
        from_account_id,
        to_account_id,
        amount,
    } = params;

    let transfer = tx
        .create_transfer(from_account_id, to_account_id, amount)
        .await?;
    let from_entry = tx.create_entry(from_account_id, -amount).await?;
    let to_entry = tx.create_entry(to_account_id, amount).await?;

    let (first, second) = order_pair(
        BalanceDelta::new(from_account_id, -amount),
        BalanceDelta::new(to_account_id, amount),
    );
    let first_account = tx.add_account_balance(first.account_id, first.delta).await?;
    let second_account = tx
        .add_account_balance(second.account_id, second.delta)
        .await?;

    let (from_account, to_account) = if first.account_id == from_account_id {
        (first_account, second_account)
    } else {
        (second_account, first_account)
    };

    Ok(TransferResult {
        transfer,
        from_account,
        to_account,
        from_entry,
        to_entry,
    })
}
