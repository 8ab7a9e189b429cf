//! Error types and result types for model operations.
//!
//! Every fallible operation in this crate returns [`DocumentStoreResult<T>`].
//! Errors raised by a store backend travel back to the caller unchanged; the
//! model layer only reports them, it never wraps or translates them.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with a document store.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// A document with the given ID already exists in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// The requested collection does not exist in the store.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    /// The document violates schema constraints or has invalid structure.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
    /// A verb name did not resolve to any known operation.
    #[error("Unknown verb: {0}")]
    UnknownVerb(String),
    /// Positional arguments did not match the shape a verb expects.
    #[error("Invalid arguments for {0}: {1}")]
    InvalidArguments(String, String),
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
    fn messages_carry_their_arguments() {
        let cases = [
            (
                DocumentStoreError::DocumentAlreadyExists("1".into(), "users".into()),
                "Document 1 already exists in collection users",
            ),
            (DocumentStoreError::CollectionNotFound("logs".into()), "Collection not found: logs"),
            (DocumentStoreError::UnknownVerb("upsert".into()), "Unknown verb: upsert"),
            (
                DocumentStoreError::InvalidArguments("update".into(), "missing update".into()),
                "Invalid arguments for update: missing update",
            ),
        ];

        for (error, message) in cases {
            assert_eq!(error.to_string(), message);
        }
    }

    #[test]
    fn json_errors_become_serialization_errors() {
        let error: DocumentStoreError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();

        assert!(matches!(error, DocumentStoreError::Serialization(_)));
    }
}
