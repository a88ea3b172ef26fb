//! Controller error types

use pad_types::{ObjectKey, ValidationError};
use std::fmt;
use thiserror::Error;

/// Store operations the reconciler performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    GetDetector,
    GetWorkload,
    CreateWorkload,
    UpdateWorkload,
}

impl StoreOperation {
    /// Whether the operation writes to the store
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            StoreOperation::CreateWorkload | StoreOperation::UpdateWorkload
        )
    }
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreOperation::GetDetector => "get detector",
            StoreOperation::GetWorkload => "get workload",
            StoreOperation::CreateWorkload => "create workload",
            StoreOperation::UpdateWorkload => "update workload",
        };
        f.write_str(name)
    }
}

/// Errors returned by record stores
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Conflict on {key}: expected resource version {expected}, found {actual}")]
    Conflict {
        key: String,
        expected: u64,
        actual: u64,
    },

    #[error("Invalid record: {0}")]
    Invalid(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by a reconciliation pass.
///
/// Absent records are not errors; they drive the reconciler's branching.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Failed to {operation} {key}: {source}")]
    Retrieval {
        operation: StoreOperation,
        key: ObjectKey,
        #[source]
        source: StoreError,
    },

    #[error("Failed to {operation} {key}: {source}")]
    Mutation {
        operation: StoreOperation,
        key: ObjectKey,
        #[source]
        source: StoreError,
    },

    #[error("Detector {key} is invalid: {source}")]
    InvalidDesiredState {
        key: ObjectKey,
        #[source]
        source: ValidationError,
    },

    #[error("Deadline exceeded during {operation} for {key}")]
    DeadlineExceeded {
        operation: StoreOperation,
        key: ObjectKey,
    },

    #[error("Cancelled during {operation} for {key}")]
    Cancelled {
        operation: StoreOperation,
        key: ObjectKey,
    },
}

impl ReconcileError {
    /// Wrap a store failure as a retrieval or mutation error
    pub fn from_store(operation: StoreOperation, key: &ObjectKey, source: StoreError) -> Self {
        if operation.is_mutation() {
            Self::Mutation {
                operation,
                key: key.clone(),
                source,
            }
        } else {
            Self::Retrieval {
                operation,
                key: key.clone(),
                source,
            }
        }
    }

    /// Identity of the record being reconciled
    pub fn key(&self) -> &ObjectKey {
        match self {
            Self::Retrieval { key, .. }
            | Self::Mutation { key, .. }
            | Self::InvalidDesiredState { key, .. }
            | Self::DeadlineExceeded { key, .. }
            | Self::Cancelled { key, .. } => key,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Result type for reconciliation
pub type Result<T> = std::result::Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_store_classifies_by_operation() {
        let key = ObjectKey::new("default", "pad");
        let err = ReconcileError::from_store(
            StoreOperation::GetWorkload,
            &key,
            StoreError::Unavailable("connection refused".into()),
        );
        assert!(matches!(err, ReconcileError::Retrieval { .. }));
        assert_eq!(
            err.to_string(),
            "Failed to get workload default/pad: Store unavailable: connection refused"
        );

        let err = ReconcileError::from_store(
            StoreOperation::UpdateWorkload,
            &key,
            StoreError::Conflict {
                key: key.to_string(),
                expected: 1,
                actual: 2,
            },
        );
        assert!(matches!(err, ReconcileError::Mutation { .. }));
        assert_eq!(err.key(), &key);
    }
}
