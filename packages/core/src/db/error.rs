//! Database Error Types
//!
//! This module defines error types for database operations, providing
//! clear error handling for connection, migration, and statement failures.

use std::path::PathBuf;
use thiserror::Error;

/// Database operation errors
///
/// Covers connection, migration, and statement execution failures. Business
/// rule violations (revision mismatches, depth limits) live in the
/// service-layer `ListStoreError`.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish database connection
    #[error("Failed to connect to database at {target}: {source}")]
    ConnectionFailed {
        target: String,
        source: libsql::Error,
    },

    /// A schema migration step failed
    #[error("Migration {version} ({name}) failed: {context}")]
    MigrationFailed {
        version: i64,
        name: String,
        context: String,
    },

    /// The database schema is older than this build expects
    #[error("Database schema is at version {found}, expected {expected}; run migrations first")]
    SchemaOutdated { found: i64, expected: i64 },

    /// Permission denied when accessing database
    #[error("Permission denied for database path: {path}")]
    PermissionDenied { path: PathBuf },

    /// Failed to create parent directory
    #[error("Failed to create parent directory for database: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    /// libsql operation error
    #[error("Database operation failed: {0}")]
    LibsqlError(#[from] libsql::Error),

    /// SQL execution error with context
    #[error("SQL execution failed: {context}")]
    SqlExecutionError { context: String },

    /// A stored value could not be decoded into its model type
    #[error("Corrupt row in {table}: {context}")]
    CorruptRow { table: &'static str, context: String },

    /// The caller cancelled the operation before it completed
    #[error("Operation cancelled")]
    Cancelled,
}

impl DatabaseError {
    /// Create a connection failed error
    pub fn connection_failed(target: impl Into<String>, source: libsql::Error) -> Self {
        Self::ConnectionFailed {
            target: target.into(),
            source,
        }
    }

    /// Create a permission denied error
    pub fn permission_denied(path: PathBuf) -> Self {
        Self::PermissionDenied { path }
    }

    /// Create a SQL execution error with context
    pub fn sql_execution(context: impl Into<String>) -> Self {
        Self::SqlExecutionError {
            context: context.into(),
        }
    }

    /// Create a migration failure error
    pub fn migration_failed(version: i64, name: &str, context: impl Into<String>) -> Self {
        Self::MigrationFailed {
            version,
            name: name.to_string(),
            context: context.into(),
        }
    }

    /// Create a corrupt row error
    pub fn corrupt_row(table: &'static str, context: impl Into<String>) -> Self {
        Self::CorruptRow {
            table,
            context: context.into(),
        }
    }
}
