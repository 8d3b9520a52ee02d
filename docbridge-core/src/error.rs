//! Error types and result types for document store operations.
//!
//! Backends report driver failures as [`DocumentStoreError::Backend`]. The store adapter
//! converts those into [`DocumentStoreError::Store`], tagged with the logical [`Operation`]
//! that failed, before they reach the caller. Identifier conversion never produces an error.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use std::fmt;
use thiserror::Error;

/// The logical adapter operation a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Connect,
    Close,
    Save,
    DeleteById,
    DeleteOne,
    DeleteMany,
    FindOne,
    FindOneAndUpdate,
    FindOneAndDelete,
    Find,
    Count,
    CreateIndex,
    ClearCollection,
    DropDatabase,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Connect => "connect",
            Operation::Close => "close",
            Operation::Save => "save",
            Operation::DeleteById => "delete_by_id",
            Operation::DeleteOne => "delete_one",
            Operation::DeleteMany => "delete_many",
            Operation::FindOne => "find_one",
            Operation::FindOneAndUpdate => "find_one_and_update",
            Operation::FindOneAndDelete => "find_one_and_delete",
            Operation::Find => "find",
            Operation::Count => "count",
            Operation::CreateIndex => "create_index",
            Operation::ClearCollection => "clear_collection",
            Operation::DropDatabase => "drop_database",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents all possible errors that can occur when interacting with a document store.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// The transport to the underlying store could not be established or maintained.
    #[error("Connection error: {0}")]
    Connection(String),
    /// The operation is not valid in the store's current lifecycle state
    /// (not yet connected, or already closed).
    #[error("Invalid state: {0}")]
    InvalidState(String),
    /// A write was accepted by the store but no identifier could be determined for it.
    #[error("Persistence error: no identifier determined for document saved in collection {collection}")]
    Persistence {
        collection: String,
    },
    /// A driver-level failure, attributed to the adapter operation that triggered it.
    #[error("Store error during {operation}: {message}")]
    Store {
        operation: Operation,
        message: String,
    },
    /// An error raised by a storage backend. The adapter rewraps it as [`DocumentStoreError::Store`].
    #[error("Backend error: {0}")]
    Backend(String),
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The document has an invalid structure for the requested operation.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// Store configuration could not be read.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl DocumentStoreError {
    /// Attributes a backend or serialization failure to `operation`.
    ///
    /// Lifecycle and persistence errors already carry their meaning and are returned unchanged.
    pub fn within(self, operation: Operation) -> Self {
        match self {
            DocumentStoreError::Backend(message)
            | DocumentStoreError::Serialization(message)
            | DocumentStoreError::InvalidDocument(message) => {
                DocumentStoreError::Store { operation, message }
            }
            other => other,
        }
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self, DocumentStoreError::InvalidState(_))
    }
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_errors_are_tagged_with_operation() {
        let err = DocumentStoreError::Backend("duplicate key".into()).within(Operation::Save);

        match err {
            DocumentStoreError::Store { operation, message } => {
                assert_eq!(operation, Operation::Save);
                assert_eq!(message, "duplicate key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn lifecycle_errors_pass_through_unchanged() {
        let err = DocumentStoreError::InvalidState("closed".into()).within(Operation::Find);
        assert!(err.is_invalid_state());

        let err = DocumentStoreError::Persistence { collection: "users".into() }.within(Operation::Save);
        assert!(matches!(err, DocumentStoreError::Persistence { .. }));
    }

    #[test]
    fn store_error_message_names_operation() {
        let err = DocumentStoreError::Backend("boom".into()).within(Operation::FindOneAndUpdate);
        assert_eq!(err.to_string(), "Store error during find_one_and_update: boom");
    }
}
