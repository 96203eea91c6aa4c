//! Error types for workflow operations
//!
//! Errors are classified for the front layer:
//! - Validation: bad or missing input
//! - Conflict: a precondition no longer holds (e.g. approving a non-pending request)
//! - NotFound: a referenced id is absent
//! - Transient: repository or notifier I/O failure; safe to retry

use thiserror::Error;

use crate::db::DbError;
use crate::notify::NotifyError;

/// Error type for RequestWorkflow and meeting operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),
}

/// Coarse classification used by front layers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Transient,
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::Validation(_) => ErrorKind::Validation,
            WorkflowError::Conflict(_) => ErrorKind::Conflict,
            WorkflowError::NotFound(_) => ErrorKind::NotFound,
            WorkflowError::Database(_) | WorkflowError::Notify(_) => ErrorKind::Transient,
        }
    }

    /// Returns true if retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

/// Serializable error representation for a front layer.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub message: String,
    pub kind: ErrorKind,
    pub can_retry: bool,
}

impl From<&WorkflowError> for ErrorResponse {
    fn from(err: &WorkflowError) -> Self {
        ErrorResponse {
            message: err.to_string(),
            kind: err.kind(),
            can_retry: err.is_transient(),
        }
    }
}
