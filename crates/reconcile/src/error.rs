//! Error taxonomy for reconciliation
//!
//! Nothing here is retried automatically. Retry policy belongs to the
//! caller or to the capability implementations.

use crate::operation::Operation;
use thiserror::Error;

/// An external mutating call returned non-success
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ExecError {
    /// What the backing system said went wrong
    pub message: String,
    /// Exit status of the external command, when there was one
    pub exit_code: Option<i32>,
}

impl ExecError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            exit_code: None,
        }
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }
}

/// Querying live state failed (system unreachable, malformed response)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ObservationError {
    pub message: String,
}

impl ObservationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors surfaced by a reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// The desired state does not carry a field the transition needs.
    /// Raised before any mutating call.
    #[error("missing required field '{field}': {context}")]
    MissingRequiredField {
        field: &'static str,
        context: String,
    },

    /// An external call failed. Operations applied before it are kept.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        operation: Operation,
        #[source]
        cause: ExecError,
    },

    /// Live state could not be queried
    #[error("failed to observe live state: {0}")]
    ObservationFailed(#[from] ObservationError),
}

impl ReconcileError {
    pub(crate) fn missing(field: &'static str, context: impl Into<String>) -> Self {
        Self::MissingRequiredField {
            field,
            context: context.into(),
        }
    }

    /// The operation that failed, if this is an operation failure
    pub fn failed_operation(&self) -> Option<&Operation> {
        match self {
            Self::OperationFailed { operation, .. } => Some(operation),
            _ => None,
        }
    }
}

/// Result type for reconciliation
pub type Result<T> = std::result::Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_failed_message() {
        let err = ReconcileError::OperationFailed {
            operation: Operation::AddPermission("admins".into()),
            cause: ExecError::new("Group 'admins' is unknown").with_exit_code(1),
        };
        assert_eq!(
            err.to_string(),
            "operation 'allow admins' failed: Group 'admins' is unknown"
        );
        assert_eq!(
            err.failed_operation(),
            Some(&Operation::AddPermission("admins".into()))
        );
    }

    #[test]
    fn test_observation_error_converts() {
        let err: ReconcileError = ObservationError::new("connection refused").into();
        assert!(matches!(err, ReconcileError::ObservationFailed(_)));
        assert!(err.failed_operation().is_none());
    }
}
