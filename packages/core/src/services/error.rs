//! Service Layer Error Types
//!
//! This module defines the errors returned by [`ListStore`](crate::services::ListStore)
//! operations. Every precondition failure is detected before any write, so an
//! error always means nothing was committed.

use crate::config::ConfigError;
use crate::db::DatabaseError;
use crate::models::ValidationError;
use crate::operations::HierarchyError;
use thiserror::Error;

/// What a `NotFound` refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    List,
    Item,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::List => "List",
            Self::Item => "Item",
        })
    }
}

/// List store operation errors
#[derive(Error, Debug)]
pub enum ListStoreError {
    /// Caller's observed revision is stale (optimistic concurrency control)
    #[error("Revision mismatch for list {list_id}: expected {expected}, current {current}")]
    RevisionMismatch {
        list_id: String,
        expected: i64,
        current: i64,
    },

    /// The mutation would nest an item deeper than the depth limit
    #[error("Maximum depth {max_depth} exceeded (attempted depth {attempted_depth})")]
    DepthExceeded {
        max_depth: usize,
        attempted_depth: usize,
    },

    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// Move target is the item itself or one of its descendants
    #[error("Circular reference: cannot move item {item_id} under {target_id}")]
    CircularReference { item_id: String, target_id: String },

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Stored parent links do not form a tree
    #[error("Corrupt hierarchy in list {list_id}: {source}")]
    CorruptHierarchy {
        list_id: String,
        source: HierarchyError,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid store configuration: {0}")]
    Config(#[from] ConfigError),

    /// Infrastructure failure; the transaction was rolled back
    #[error("Database operation failed: {0}")]
    Database(DatabaseError),
}

impl From<DatabaseError> for ListStoreError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::Cancelled => Self::Cancelled,
            other => Self::Database(other),
        }
    }
}

impl From<libsql::Error> for ListStoreError {
    fn from(e: libsql::Error) -> Self {
        Self::Database(DatabaseError::LibsqlError(e))
    }
}

impl ListStoreError {
    pub fn revision_mismatch(list_id: impl Into<String>, expected: i64, current: i64) -> Self {
        Self::RevisionMismatch {
            list_id: list_id.into(),
            expected,
            current,
        }
    }

    pub fn depth_exceeded(max_depth: usize, attempted_depth: usize) -> Self {
        Self::DepthExceeded {
            max_depth,
            attempted_depth,
        }
    }

    pub fn list_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: EntityKind::List,
            id: id.into(),
        }
    }

    pub fn item_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: EntityKind::Item,
            id: id.into(),
        }
    }

    pub fn circular_reference(item_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self::CircularReference {
            item_id: item_id.into(),
            target_id: target_id.into(),
        }
    }

    /// Map a snapshot walk failure
    ///
    /// An unknown item inside a loaded snapshot means the caller referenced
    /// an item outside the list, which is reported as `NotFound`.
    pub fn from_hierarchy(list_id: &str, e: HierarchyError) -> Self {
        match e {
            HierarchyError::UnknownItem(id) => Self::item_not_found(id),
            source => Self::CorruptHierarchy {
                list_id: list_id.to_string(),
                source,
            },
        }
    }

    /// The list's current revision, when the error carries it
    pub fn current_revision(&self) -> Option<i64> {
        match self {
            Self::RevisionMismatch { current, .. } => Some(*current),
            _ => None,
        }
    }

    /// Whether re-reading the list and retrying can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RevisionMismatch { .. })
    }
}
