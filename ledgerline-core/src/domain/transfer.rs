//! Transfer domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};
use super::{Account, Entry};

/// A recorded movement of funds between two distinct accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: i64,
    pub from_account_id: i64,
    pub to_account_id: i64,
    /// Always positive
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

impl Transfer {
    pub fn new(id: i64, from_account_id: i64, to_account_id: i64, amount: i64) -> Self {
        Self {
            id,
            from_account_id,
            to_account_id,
            amount,
            created_at: Utc::now(),
        }
    }
}

/// Input of a transfer request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferParams {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: i64,
}

impl TransferParams {
    pub fn new(from_account_id: i64, to_account_id: i64, amount: i64) -> Self {
        Self {
            from_account_id,
            to_account_id,
            amount,
        }
    }

    /// Reject requests that must never reach the store
    pub fn validate(&self) -> Result<()> {
        if self.from_account_id == self.to_account_id {
            return Err(Error::invalid_input(format!(
                "cannot transfer from account {} to itself",
                self.from_account_id
            )));
        }
        if self.amount <= 0 {
            return Err(Error::invalid_input(format!(
                "transfer amount must be positive, got {}",
                self.amount
            )));
        }
        Ok(())
    }
}

/// Post-transaction view of a committed transfer
///
/// Not persisted as a row of its own; the account snapshots reflect the
/// balances written by the same unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    pub transfer: Transfer,
    pub from_account: Account,
    pub to_account: Account,
    pub from_entry: Entry,
    pub to_entry: Entry,
}
