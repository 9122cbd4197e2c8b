//! Unit-of-work boundary - commit or roll back around a step function
//!
//! The step function receives a store handle scoped to one unit of work.
//! Every exit path releases that handle exactly once:
//!
//! | outcome of the step        | action   | returned                        |
//! |----------------------------|----------|---------------------------------|
//! | `Ok(value)`                | commit   | `value`, or commit failure      |
//! | `Err(cause)`               | rollback | `cause`, or cause + rollback    |
//! | cancellation signal fired  | rollback | `Cancelled`                     |
//! | cancelled before `begin`   | none     | `Cancelled`                     |
//! | panic                      | rollback | the panic is resumed            |
//!
//! No retries happen here. Contention is surfaced to the caller.
//!
//! The signal is only observed at await points. A step whose store calls
//! complete synchronously (the DuckDB adapter) runs to the end on its first
//! poll, so cancellation covers waiting for `begin` and lock waits, not the
//! execution of individual statements.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::domain::{Error, Result};
use crate::ports::{TransactionalStore, UnitOfWork};

/// Run `f` inside one unit of work opened on `store`
pub async fn run_in_transaction<S, T, F>(store: &S, f: F) -> Result<T>
where
    S: TransactionalStore,
    T: Send,
    F: for<'a> FnOnce(&'a mut S::UnitOfWork) -> BoxFuture<'a, Result<T>> + Send,
{
    run_in_transaction_until(store, std::future::pending::<()>(), f).await
}

/// Run `f` inside one unit of work, abandoning it when `cancel` resolves.
///
/// Cancellation drops the in-flight step and rolls the unit of work back, so
/// none of its writes are ever observed by another transaction.
pub async fn run_in_transaction_until<S, T, F, C>(store: &S, cancel: C, f: F) -> Result<T>
where
    S: TransactionalStore,
    T: Send,
    F: for<'a> FnOnce(&'a mut S::UnitOfWork) -> BoxFuture<'a, Result<T>> + Send,
    C: Future<Output = ()> + Send,
{
    tokio::pin!(cancel);

    // Nothing is open yet, so losing this race needs no rollback.
    let mut uow = tokio::select! {
        biased;
        opened = store.begin() => opened?,
        () = &mut cancel => {
            tracing::debug!("cancelled while waiting to begin");
            return Err(Error::cancelled("cancelled before the unit of work began"));
        }
    };

    let outcome = {
        let step = AssertUnwindSafe(f(&mut uow)).catch_unwind();
        tokio::select! {
            biased;
            outcome = step => Some(outcome),
            () = &mut cancel => None,
        }
    };

    match outcome {
        Some(Ok(Ok(value))) => match uow.commit().await {
            Ok(()) => Ok(value),
            Err(e) => {
                tracing::error!(error = %e, "commit failed");
                Err(Error::commit_failed(e))
            }
        },
        Some(Ok(Err(cause))) => abort(uow, cause).await,
        Some(Err(panic)) => {
            if let Err(e) = uow.rollback().await {
                tracing::error!(error = %e, "rollback after panic failed");
            }
            std::panic::resume_unwind(panic)
        }
        None => abort(uow, Error::cancelled("unit of work abandoned by caller")).await,
    }
}

async fn abort<U: UnitOfWork, T>(uow: U, cause: Error) -> Result<T> {
    match uow.rollback().await {
        Ok(()) => {
            tracing::debug!(error = %cause, "unit of work rolled back");
            Err(cause)
        }
        Err(rollback) => {
            tracing::error!(error = %cause, rollback_error = %rollback, "rollback failed");
            Err(Error::rollback_failed(cause, rollback))
        }
    }
}
