//! Error types for the domain layer.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`StorageError`] - Database/repository errors
//! - [`ServiceError`] - Errors surfaced by [`crate::services::ContentService`]
//!
//! Cursor decoding failures live in [`crate::cursor::CursorError`]; they are
//! recovered locally and never reach the caller.
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Storage Errors
// =============================================================================

/// Database and repository errors.
///
/// These errors originate from storage operations like queries,
/// transactions, and data serialization.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to establish database connection.
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// SQL query execution failed.
    #[error("Query execution error: {0}")]
    QueryError(String),

    /// Database constraint was violated (unique, foreign key, etc.).
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Database migration failed.
    #[error("Migration error: {0}")]
    MigrationError(String),

    /// Transaction commit/rollback failed.
    #[error("Transaction error: {0}")]
    TransactionError(String),

    /// Data serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The storage call did not complete in time.
    #[error("Storage timeout: {0}")]
    Timeout(String),
}

// =============================================================================
// Service Errors
// =============================================================================

/// Errors returned by content operations.
///
/// `Unauthorized` is deliberately uniform: a missing object and an object the
/// requester may not act on produce the same value.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The ownership guard or a personal-data check denied the operation.
    #[error("Not authorized to perform this action")]
    Unauthorized,

    /// Input rejected before any storage call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The storage collaborator failed or timed out.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ServiceError {
    /// Shorthand for building a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for content operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
