//! Account domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A ledger account
///
/// `balance` is kept in the smallest currency unit. It only changes through
/// balance-delta operations issued inside a unit of work; `currency_id` never
/// changes after the account is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub owner: String,
    pub currency_id: i64,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create a freshly opened account with a zero balance
    pub fn new(id: i64, owner: impl Into<String>, currency_id: i64) -> Self {
        Self {
            id,
            owner: owner.into(),
            currency_id,
            balance: 0,
            created_at: Utc::now(),
        }
    }

    /// Apply a signed delta, refusing results outside the `i64` range
    pub fn checked_balance_after(&self, delta: i64) -> Option<i64> {
        self.balance.checked_add(delta)
    }
}

/// Input for opening an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    pub owner: String,
    pub currency_id: i64,
}

impl NewAccount {
    pub fn new(owner: impl Into<String>, currency_id: i64) -> Self {
        Self {
            owner: owner.into(),
            currency_id,
        }
    }

    /// Validate account data
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.owner.trim().is_empty() {
            return Err("account owner cannot be empty");
        }
        if self.currency_id <= 0 {
            return Err("currency id must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_starts_empty() {
        let account = Account::new(1, "alice", 1);
        assert_eq!(account.balance, 0);
        assert_eq!(account.owner, "alice");
    }

    #[test]
    fn test_checked_balance_after() {
        let mut account = Account::new(1, "alice", 1);
        account.balance = i64::MAX - 1;
        assert_eq!(account.checked_balance_after(1), Some(i64::MAX));
        assert_eq!(account.checked_balance_after(2), None);
        assert_eq!(account.checked_balance_after(-5), Some(i64::MAX - 6));
    }

    #[test]
    fn test_new_account_validation() {
        assert!(NewAccount::new("alice", 1).validate().is_ok());
        assert!(NewAccount::new("  ", 1).validate().is_err());
        assert!(NewAccount::new("alice", 0).validate().is_err());
    }
}
