//! Completion toggles with parent/child rollup

use crate::db::{ListEvent, Transaction};
use crate::models::require_id;
use crate::operations::{plan_completion, CompletionPlan};
use crate::services::error::ListStoreError;
use crate::services::list_store::ListStore;
use crate::services::outcome::CompletionChange;
use crate::services::queries::{load_item, load_snapshot, mark_complete, mark_incomplete};
use crate::services::revision_gate::RevisionGate;
use tokio_util::sync::CancellationToken;

impl ListStore {
    /// Set an item's completion, attributing it to `user_id`
    ///
    /// Completing requires every direct child to be complete; a parent whose
    /// last incomplete child completes is completed too, recursively.
    /// Uncompleting clears the item and every ancestor. Not gated by a caller
    /// revision, but any applied change bumps the revision once.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn set_item_completed_by_user(
        &self,
        item_id: &str,
        user_id: &str,
        completed: bool,
        cancel: &CancellationToken,
    ) -> Result<CompletionChange, ListStoreError> {
        self.set_completion(item_id, user_id, completed, None, cancel)
            .await
    }

    /// [`set_item_completed_by_user`](Self::set_item_completed_by_user)
    /// behind the revision gate
    #[tracing::instrument(skip(self, cancel))]
    pub async fn set_item_completed_checked(
        &self,
        item_id: &str,
        user_id: &str,
        completed: bool,
        expected_revision: i64,
        cancel: &CancellationToken,
    ) -> Result<CompletionChange, ListStoreError> {
        self.set_completion(item_id, user_id, completed, Some(expected_revision), cancel)
            .await
    }

    async fn set_completion(
        &self,
        item_id: &str,
        user_id: &str,
        completed: bool,
        expected_revision: Option<i64>,
        cancel: &CancellationToken,
    ) -> Result<CompletionChange, ListStoreError> {
        require_id(user_id, "user_id")?;

        let tx = self.db.begin_write(cancel).await?;
        let result = self
            .completion_in(&tx, item_id, user_id, completed, expected_revision)
            .await;
        let (list_id, change) = tx.finish(result).await?;

        if let CompletionChange::Applied { new_revision, .. } = &change {
            self.emit_event(ListEvent::CompletionChanged {
                list_id,
                item_id: item_id.to_string(),
                completed,
                revision: *new_revision,
            });
        }
        Ok(change)
    }

    async fn completion_in(
        &self,
        tx: &Transaction,
        item_id: &str,
        user_id: &str,
        completed: bool,
        expected_revision: Option<i64>,
    ) -> Result<(String, CompletionChange), ListStoreError> {
        let item = load_item(tx, item_id).await?;
        let list_id = item.list_id;
        let gate = match expected_revision {
            Some(expected) => RevisionGate::open_checked(tx, &list_id, expected).await?,
            None => RevisionGate::open(tx, &list_id).await?,
        };

        let snapshot = load_snapshot(tx, &list_id).await?;
        let plan = plan_completion(&snapshot, item_id, completed)
            .map_err(|e| ListStoreError::from_hierarchy(&list_id, e))?;

        let writes = match plan {
            CompletionPlan::Unchanged => return Ok((list_id, CompletionChange::Unchanged)),
            CompletionPlan::Blocked {
                incomplete_children,
            } => {
                tracing::debug!(
                    item_id,
                    blocking = incomplete_children.len(),
                    "Completion blocked by incomplete children"
                );
                return Ok((
                    list_id,
                    CompletionChange::BlockedByChildren {
                        incomplete_children,
                    },
                ));
            }
            CompletionPlan::Apply(writes) => writes,
        };

        mark_complete(tx, &writes.complete, user_id).await?;
        mark_incomplete(tx, &writes.incomplete).await?;

        let change = CompletionChange::Applied {
            new_revision: gate.advance(tx).await?,
            affected: writes.affected() as u64,
        };
        Ok((list_id, change))
    }
}

#[cfg(test)]
#[path = "completion_test.rs"]
mod completion_test;
