//! In-process task distributor backed by a tokio channel

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::{Error, Result};
use crate::ports::{TaskDistributor, VerifyEmailPayload};

/// A task handed to the background worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    SendVerifyEmail(VerifyEmailPayload),
}

/// Distributes tasks to whoever holds the receiving end
#[derive(Clone)]
pub struct ChannelTaskDistributor {
    sender: mpsc::UnboundedSender<Task>,
}

impl ChannelTaskDistributor {
    /// Create a distributor and the receiver its tasks arrive on
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Task>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl TaskDistributor for ChannelTaskDistributor {
    async fn distribute_send_verify_email(&self, payload: VerifyEmailPayload) -> Result<()> {
        tracing::debug!(username = %payload.username, "enqueue verification email");
        self.sender
            .send(Task::SendVerifyEmail(payload))
            .map_err(|_| Error::queue("task queue closed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_task_reaches_receiver() {
        let (distributor, mut receiver) = ChannelTaskDistributor::new();
        let payload = VerifyEmailPayload {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
        };

        distributor
            .distribute_send_verify_email(payload.clone())
            .await
            .unwrap();

        assert_eq!(receiver.recv().await, Some(Task::SendVerifyEmail(payload)));
    }

    #[tokio::test]
    async fn test_closed_queue_is_an_error() {
        let (distributor, receiver) = ChannelTaskDistributor::new();
        drop(receiver);

        let result = distributor
            .distribute_send_verify_email(VerifyEmailPayload {
                username: "bob".to_string(),
                email: "bob@example.com".to_string(),
            })
            .await;
        let err = result.unwrap_err();
        assert!(matches!(err, Error::Queue(_)), "got {:?}", err);
        assert_eq!(err.kind(), crate::domain::ErrorKind::Internal);
    }
}
