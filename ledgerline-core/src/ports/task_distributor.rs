//! Task distributor port - asynchronous side-effect work

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::Result;

/// Payload of the verification email sent after registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyEmailPayload {
    pub username: String,
    pub email: String,
}

/// Enqueues work for at-least-once background processing
///
/// Delivery is outside the ledger's transactional guarantees: a task may be
/// enqueued for a unit of work that later fails to commit.
#[async_trait]
pub trait TaskDistributor: Send + Sync {
    async fn distribute_send_verify_email(&self, payload: VerifyEmailPayload) -> Result<()>;
}
