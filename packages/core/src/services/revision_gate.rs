//! Per-list optimistic concurrency
//!
//! Each mutation opens a [`RevisionGate`] as the first statement of its write
//! transaction. Because write transactions start with `BEGIN IMMEDIATE`, the
//! revision read here is serialized against every other writer, and the
//! compare-and-increment in [`RevisionGate::advance`] cannot race.

use crate::db::Transaction;
use crate::models::{format_timestamp, TodoList, LIST_COLUMNS};
use crate::services::error::ListStoreError;
use chrono::Utc;
use libsql::params;

/// The list row a mutation is gated on
#[derive(Debug)]
pub(crate) struct RevisionGate {
    list: TodoList,
}

impl RevisionGate {
    /// Load the list without a revision check (self-derived mutations)
    ///
    /// Soft-deleted lists are reported as `NotFound`.
    pub(crate) async fn open(tx: &Transaction, list_id: &str) -> Result<Self, ListStoreError> {
        let gate = Self::open_including_deleted(tx, list_id).await?;
        if gate.list.is_deleted {
            return Err(ListStoreError::list_not_found(list_id));
        }
        Ok(gate)
    }

    /// Load the list and require `expected` to be its current revision
    pub(crate) async fn open_checked(
        tx: &Transaction,
        list_id: &str,
        expected: i64,
    ) -> Result<Self, ListStoreError> {
        let gate = Self::open(tx, list_id).await?;
        gate.check(expected)?;
        Ok(gate)
    }

    /// Load the list even if it is soft-deleted (restore)
    pub(crate) async fn open_including_deleted(
        tx: &Transaction,
        list_id: &str,
    ) -> Result<Self, ListStoreError> {
        let row = tx
            .query_opt(
                &format!("SELECT {} FROM lists WHERE id = ?", LIST_COLUMNS),
                params![list_id],
                "read list revision",
            )
            .await?
            .ok_or_else(|| ListStoreError::list_not_found(list_id))?;

        Ok(Self {
            list: TodoList::from_row(&row)?,
        })
    }

    /// Fail with `RevisionMismatch` unless `expected` is current
    pub(crate) fn check(&self, expected: i64) -> Result<(), ListStoreError> {
        if self.list.revision != expected {
            tracing::debug!(
                list_id = %self.list.id,
                expected,
                current = self.list.revision,
                "Revision mismatch"
            );
            return Err(ListStoreError::revision_mismatch(
                &self.list.id,
                expected,
                self.list.revision,
            ));
        }
        Ok(())
    }

    pub(crate) fn list(&self) -> &TodoList {
        &self.list
    }

    pub(crate) fn revision(&self) -> i64 {
        self.list.revision
    }

    /// Increment the revision exactly once and return the new value
    ///
    /// Consumes the gate so a mutation cannot bump twice.
    pub(crate) async fn advance(self, tx: &Transaction) -> Result<i64, ListStoreError> {
        let changed = tx
            .execute(
                "UPDATE lists SET revision = revision + 1, updated_at = ? WHERE id = ? AND revision = ?",
                params![format_timestamp(Utc::now()), self.list.id.as_str(), self.list.revision],
                "advance list revision",
            )
            .await?;

        if changed != 1 {
            // Only reachable if the write lock was not held
            return Err(ListStoreError::revision_mismatch(
                &self.list.id,
                self.list.revision,
                self.list.revision + 1,
            ));
        }

        Ok(self.list.revision + 1)
    }
}
