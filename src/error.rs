//! Error types for the update engine.
//!
//! Mirrors the taxonomy laid out for the core: `UnknownClass`,
//! `UnknownProperty`, `InvalidType`, `Constraint`, `Storage`, `Internal`.
//! `EngineError` is the only error type returned by the public statement
//! API; `StorageError` wraps the backing redb store.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Top-level error enum returned by all public engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// `rdf:type` object is not a known class in the ontology.
    #[error("unknown class: {0}")]
    UnknownClass(String),

    /// Predicate is neither a known property nor the virtual `tracker:uri`.
    #[error("unknown property: {0}")]
    UnknownProperty(String),

    /// `_with_uri` used on a literal-typed property, or `_with_string` used
    /// on a resource-typed property.
    #[error("invalid type for property '{property}': {reason}")]
    InvalidType {
        property: String,
        reason: String,
    },

    /// Domain violation, or a second value set on a single-valued property.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Propagated from the backing store.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A violated invariant. Fatal: callers should treat this as
    /// unrecoverable and terminate rather than continue transacting.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn unknown_class(uri: impl Into<String>) -> Self {
        Self::UnknownClass(uri.into())
    }

    pub fn unknown_property(uri: impl Into<String>) -> Self {
        Self::UnknownProperty(uri.into())
    }

    pub fn invalid_type(property: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidType {
            property: property.into(),
            reason: reason.into(),
        }
    }

    pub fn constraint(reason: impl Into<String>) -> Self {
        Self::Constraint(reason.into())
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(reason.into())
    }

    /// True for fatal errors: invariant violations the engine cannot
    /// recover from by clearing the buffer.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

/// Storage-layer errors, wrapping the backing redb store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("commit failed: {0}")]
    Commit(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("storage engine error: {0}")]
    Backend(String),

    #[error("savepoint error: {0}")]
    Savepoint(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("no active transaction")]
    NoActiveTransaction,

    #[error("schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch { expected: u32, found: u32 },
}

impl From<redb::TransactionError> for StorageError {
    fn from(err: redb::TransactionError) -> Self {
        StorageError::Transaction(err.to_string())
    }
}

impl From<redb::CommitError> for StorageError {
    fn from(err: redb::CommitError) -> Self {
        StorageError::Commit(err.to_string())
    }
}

impl From<redb::TableError> for StorageError {
    fn from(err: redb::TableError) -> Self {
        StorageError::Table(err.to_string())
    }
}

impl From<redb::StorageError> for StorageError {
    fn from(err: redb::StorageError) -> Self {
        StorageError::Backend(err.to_string())
    }
}

impl From<redb::DatabaseError> for StorageError {
    fn from(err: redb::DatabaseError) -> Self {
        StorageError::Database(err.to_string())
    }
}

impl From<redb::SavepointError> for StorageError {
    fn from(err: redb::SavepointError) -> Self {
        StorageError::Savepoint(err.to_string())
    }
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

// Convenience conversions straight to EngineError, through the two-level
// ladder (storage error -> top-level error).
impl From<redb::TransactionError> for EngineError {
    fn from(err: redb::TransactionError) -> Self {
        EngineError::Storage(err.into())
    }
}

impl From<redb::CommitError> for EngineError {
    fn from(err: redb::CommitError) -> Self {
        EngineError::Storage(err.into())
    }
}

impl From<redb::TableError> for EngineError {
    fn from(err: redb::TableError) -> Self {
        EngineError::Storage(err.into())
    }
}

impl From<redb::StorageError> for EngineError {
    fn from(err: redb::StorageError) -> Self {
        EngineError::Storage(err.into())
    }
}

impl From<redb::DatabaseError> for EngineError {
    fn from(err: redb::DatabaseError) -> Self {
        EngineError::Storage(err.into())
    }
}

impl From<redb::SavepointError> for EngineError {
    fn from(err: redb::SavepointError) -> Self {
        EngineError::Storage(err.into())
    }
}

impl From<bincode::Error> for EngineError {
    fn from(err: bincode::Error) -> Self {
        EngineError::Storage(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_only_for_internal() {
        assert!(EngineError::internal("bad state").is_fatal());
        assert!(!EngineError::constraint("dup").is_fatal());
    }

    #[test]
    fn display_messages() {
        let err = EngineError::unknown_class("nie:Foo");
        assert_eq!(err.to_string(), "unknown class: nie:Foo");
    }
}
