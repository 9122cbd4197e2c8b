//! Entry domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One signed delta applied to one account's balance
///
/// Entries are append-only: once written they are never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    pub account_id: i64,
    /// Negative for the debited side, positive for the credited side
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

impl Entry {
    pub fn new(id: i64, account_id: i64, amount: i64) -> Self {
        Self {
            id,
            account_id,
            amount,
            created_at: Utc::now(),
        }
    }

    pub fn is_debit(&self) -> bool {
        self.amount < 0
    }
}
