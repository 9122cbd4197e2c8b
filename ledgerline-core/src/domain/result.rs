//! Result and error types for the core library

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
///
/// Every failure of a ledger operation surfaces as one of these variants.
/// Nothing is swallowed or turned into a boolean flag; callers map
/// [`Error::kind`] to whatever status codes their transport uses.
#[derive(Error, Debug)]
pub enum Error {
    /// The request itself is malformed (equal accounts, non-positive amount, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A store-level constraint rejected a write (uniqueness, checks, overflow)
    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Database error: {0}")]
    Database(String),

    /// Commit failed, or rollback failed after an earlier error.
    ///
    /// The store state can no longer be reasoned about from this process.
    #[error("{}", describe_transaction_failure(.cause, .rollback))]
    TransactionFailure {
        cause: Box<Error>,
        rollback: Option<Box<Error>>,
    },

    /// The unit of work was abandoned through the caller's cancellation signal
    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The background task queue refused a task
    #[error("Task queue error: {0}")]
    Queue(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn describe_transaction_failure(cause: &Error, rollback: &Option<Box<Error>>) -> String {
    match rollback {
        Some(rollback) => format!("tx error: {}, rollback error: {}", cause, rollback),
        None => format!("commit failed: {}", cause),
    }
}

/// Coarse classification of [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Constraint,
    TransactionFailure,
    Cancelled,
    Internal,
}

impl Error {
    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a constraint violation error
    pub fn constraint(msg: impl Into<String>) -> Self {
        Self::Constraint(msg.into())
    }

    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a task queue error
    pub fn queue(msg: impl Into<String>) -> Self {
        Self::Queue(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a cancellation error
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Commit of an otherwise successful unit of work failed
    pub fn commit_failed(cause: Error) -> Self {
        Self::TransactionFailure {
            cause: Box::new(cause),
            rollback: None,
        }
    }

    /// Rollback failed while handling `cause`; both are kept
    pub fn rollback_failed(cause: Error, rollback: Error) -> Self {
        Self::TransactionFailure {
            cause: Box::new(cause),
            rollback: Some(Box::new(rollback)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Constraint(_) => ErrorKind::Constraint,
            Error::TransactionFailure { .. } => ErrorKind::TransactionFailure,
            Error::Cancelled(_) => ErrorKind::Cancelled,
            Error::Database(_)
            | Error::Config(_)
            | Error::Queue(_)
            | Error::Internal(_)
            | Error::Io(_)
            | Error::Json(_) => ErrorKind::Internal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result with optional context (for JSON output)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_kind: None,
            context: None,
        }
    }

    /// Create a successful result with context
    pub fn ok_with_context(data: T, context: HashMap<String, serde_json::Value>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_kind: None,
            context: Some(context),
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            error_kind: None,
            context: None,
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => {
                let mut failed = Self::fail(e.to_string());
                failed.error_kind = Some(e.kind());
                failed
            }
        }
    }
}
