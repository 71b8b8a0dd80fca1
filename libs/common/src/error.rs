//! Custom error types for the common library
//!
//! This module defines the errors raised by the database layer and by the
//! document store built on top of it.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Errors raised by a [`crate::store::DocumentStore`] backend
#[derive(Error, Debug)]
pub enum StoreError {
    /// A unique index rejected the write
    #[error("Duplicate value in {collection} for ({fields})")]
    Duplicate { collection: String, fields: String },

    /// The document is not shaped the way the store expects
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// The document could not be converted to or from its typed model
    #[error("Document serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Underlying database failure
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Type alias for Result with StoreError
pub type StoreResult<T> = Result<T, StoreError>;
