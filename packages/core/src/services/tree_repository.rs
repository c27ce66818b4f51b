//! Item tree operations
//!
//! Structural and content mutations of a list's items. Every check (list
//! membership, depth, cycles) runs against reads inside the write
//! transaction, before the first write.

use crate::db::{ListEvent, Transaction};
use crate::models::{normalize_name, CompletionState, Item, ItemView, ValidationError};
use crate::operations::{
    plan_incomplete_arrival, plan_subtree_reset, HierarchyNode, HierarchySnapshot, OrderPlan,
};
use crate::services::error::ListStoreError;
use crate::services::list_store::ListStore;
use crate::services::outcome::{
    DeleteOutcome, ItemCreated, MoveOutcome, MutationOutcome, ReorderOutcome, ResetOutcome,
};
use crate::services::queries::{
    load_item, load_items, load_snapshot, mark_incomplete, max_sibling_order, now, sibling_keys,
    write_order_keys,
};
use crate::services::revision_gate::RevisionGate;
use libsql::params;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

impl ListStore {
    /// Append a root item to a list
    ///
    /// Not gated by a caller revision: the order key is derived from the
    /// current siblings inside the transaction. Still bumps the revision.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn add_item(
        &self,
        list_id: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<ItemCreated, ListStoreError> {
        let name = normalize_name(name)?;

        let tx = self.db.begin_write(cancel).await?;
        let result = async {
            let gate = RevisionGate::open(&tx, list_id).await?;
            let created = self.insert_item(&tx, list_id, &name, None).await?;
            Ok::<_, ListStoreError>((created, gate.advance(&tx).await?))
        }
        .await;
        let ((item_id, order), new_revision) = tx.finish(result).await?;

        self.emit_event(ListEvent::ItemCreated {
            list_id: list_id.to_string(),
            item_id: item_id.clone(),
            parent_item_id: None,
            revision: new_revision,
        });
        Ok(ItemCreated {
            item_id,
            order,
            new_revision,
        })
    }

    /// Append a child under `parent_id`
    ///
    /// # Errors
    ///
    /// - `RevisionMismatch` if `expected_revision` is stale
    /// - `NotFound` if the parent is not an item of `list_id`
    /// - `DepthExceeded` if the child would sit below the depth limit
    #[tracing::instrument(skip(self, cancel))]
    pub async fn add_child_item(
        &self,
        list_id: &str,
        name: &str,
        parent_id: &str,
        expected_revision: i64,
        cancel: &CancellationToken,
    ) -> Result<ItemCreated, ListStoreError> {
        let name = normalize_name(name)?;

        let tx = self.db.begin_write(cancel).await?;
        let result = async {
            let gate = RevisionGate::open_checked(&tx, list_id, expected_revision).await?;
            let snapshot = load_snapshot(&tx, list_id).await?;
            if snapshot.get(parent_id).is_none() {
                return Err(ListStoreError::item_not_found(parent_id));
            }

            let attempted_depth = self.depth(&snapshot, list_id, parent_id)? + 1;
            if attempted_depth > self.max_depth {
                tracing::debug!(parent_id, attempted_depth, "Child rejected by depth limit");
                return Err(ListStoreError::depth_exceeded(self.max_depth, attempted_depth));
            }

            let created = self.insert_item(&tx, list_id, &name, Some(parent_id)).await?;
            let reopened = plan_incomplete_arrival(&snapshot, parent_id)
                .map_err(|e| ListStoreError::from_hierarchy(list_id, e))?;
            mark_incomplete(&tx, &reopened).await?;

            Ok::<_, ListStoreError>((created, gate.advance(&tx).await?))
        }
        .await;
        let ((item_id, order), new_revision) = tx.finish(result).await?;

        self.emit_event(ListEvent::ItemCreated {
            list_id: list_id.to_string(),
            item_id: item_id.clone(),
            parent_item_id: Some(parent_id.to_string()),
            revision: new_revision,
        });
        Ok(ItemCreated {
            item_id,
            order,
            new_revision,
        })
    }

    /// Move an item (and its subtree) under a new parent, or to the root
    ///
    /// The moved item is appended after its new siblings. Moving to the
    /// current parent succeeds without a revision bump, but only against the
    /// current revision.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn move_item(
        &self,
        item_id: &str,
        new_parent_id: Option<&str>,
        expected_revision: i64,
        cancel: &CancellationToken,
    ) -> Result<MoveOutcome, ListStoreError> {
        let tx = self.db.begin_write(cancel).await?;
        let result = self
            .move_item_in(&tx, item_id, new_parent_id, expected_revision)
            .await;
        let (list_id, outcome) = tx.finish(result).await?;

        if outcome.moved {
            self.emit_event(ListEvent::ItemMoved {
                list_id,
                item_id: item_id.to_string(),
                new_parent_item_id: new_parent_id.map(str::to_string),
                revision: outcome.new_revision,
            });
        }
        Ok(outcome)
    }

    async fn move_item_in(
        &self,
        tx: &Transaction,
        item_id: &str,
        new_parent_id: Option<&str>,
        expected_revision: i64,
    ) -> Result<(String, MoveOutcome), ListStoreError> {
        let item = load_item(tx, item_id).await?;
        let list_id = item.list_id.clone();
        let gate = RevisionGate::open_checked(tx, &list_id, expected_revision).await?;

        if item.parent_item_id.as_deref() == new_parent_id {
            let outcome = MoveOutcome {
                moved: false,
                new_revision: gate.revision(),
            };
            return Ok((list_id, outcome));
        }

        let snapshot = load_snapshot(tx, &list_id).await?;
        let parent_depth = match new_parent_id {
            None => 0,
            Some(parent_id) => {
                if snapshot.get(parent_id).is_none() {
                    return Err(ListStoreError::item_not_found(parent_id));
                }
                let circular = parent_id == item_id
                    || snapshot
                        .is_descendant(item_id, parent_id)
                        .map_err(|e| ListStoreError::from_hierarchy(&list_id, e))?;
                if circular {
                    return Err(ListStoreError::circular_reference(item_id, parent_id));
                }
                self.depth(&snapshot, &list_id, parent_id)?
            }
        };

        let height = snapshot
            .subtree_height(item_id)
            .map_err(|e| ListStoreError::from_hierarchy(&list_id, e))?;
        let attempted_depth = parent_depth + height;
        if attempted_depth > self.max_depth {
            tracing::debug!(item_id, attempted_depth, "Move rejected by depth limit");
            return Err(ListStoreError::depth_exceeded(self.max_depth, attempted_depth));
        }

        let order = self
            .allocator
            .next_after(max_sibling_order(tx, &list_id, new_parent_id).await?)?;
        tx.execute(
            "UPDATE items SET parent_item_id = ?, sort_order = ?, updated_at = ? WHERE id = ?",
            params![new_parent_id, order, now(), item_id],
            "move item",
        )
        .await?;

        if let Some(parent_id) = new_parent_id.filter(|_| !item.is_completed) {
            let reopened = plan_incomplete_arrival(&snapshot, parent_id)
                .map_err(|e| ListStoreError::from_hierarchy(&list_id, e))?;
            mark_incomplete(tx, &reopened).await?;
        }

        let outcome = MoveOutcome {
            moved: true,
            new_revision: gate.advance(tx).await?,
        };
        Ok((list_id, outcome))
    }

    /// Place an item between two of its current siblings
    ///
    /// With both neighbours given they must be adjacent. A lone
    /// `prev_sibling_id` places the item right after it, a lone
    /// `next_sibling_id` right before it, and neither places it last. A
    /// midpoint key is used when one exists, otherwise the sibling group is
    /// renumbered.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn move_item_between(
        &self,
        item_id: &str,
        prev_sibling_id: Option<&str>,
        next_sibling_id: Option<&str>,
        expected_revision: i64,
        cancel: &CancellationToken,
    ) -> Result<ReorderOutcome, ListStoreError> {
        let tx = self.db.begin_write(cancel).await?;
        let result = async {
            let item = load_item(&tx, item_id).await?;
            let gate = RevisionGate::open_checked(&tx, &item.list_id, expected_revision).await?;
            let siblings = sibling_keys(
                &tx,
                &item.list_id,
                item.parent_item_id.as_deref(),
                Some(item_id),
            )
            .await?;

            let position = |id: &str| {
                siblings
                    .iter()
                    .position(|s| s.id == id)
                    .ok_or_else(|| ListStoreError::item_not_found(id))
            };
            let after_id = match (prev_sibling_id, next_sibling_id) {
                (Some(prev), Some(next)) => {
                    if position(next)? != position(prev)? + 1 {
                        return Err(ListStoreError::from(ValidationError::NotAdjacent {
                            prev: prev.to_string(),
                            next: next.to_string(),
                        }));
                    }
                    Some(prev.to_string())
                }
                (Some(prev), None) => {
                    position(prev)?;
                    Some(prev.to_string())
                }
                (None, Some(next)) => position(next)?
                    .checked_sub(1)
                    .map(|i| siblings[i].id.clone()),
                (None, None) => siblings.last().map(|s| s.id.clone()),
            };

            let plan = self
                .allocator
                .plan_place_after(&siblings, item_id, after_id.as_deref())
                .ok_or_else(|| ListStoreError::item_not_found(after_id.clone().unwrap_or_default()))?;
            let order = self.apply_order_plan(&tx, item_id, &plan).await?;

            Ok::<_, ListStoreError>((item.list_id, order, gate.advance(&tx).await?))
        }
        .await;
        let (list_id, (order, renumbered), new_revision) = tx.finish(result).await?;

        self.emit_event(ListEvent::ItemUpdated {
            list_id,
            item_id: item_id.to_string(),
            revision: new_revision,
        });
        Ok(ReorderOutcome {
            order,
            renumbered,
            new_revision,
        })
    }

    /// Overwrite an item's sibling order key
    ///
    /// If another sibling already holds `new_order`, the group is renumbered
    /// so the item sorts immediately before that sibling.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn set_item_order(
        &self,
        item_id: &str,
        new_order: i64,
        expected_revision: i64,
        cancel: &CancellationToken,
    ) -> Result<ReorderOutcome, ListStoreError> {
        let tx = self.db.begin_write(cancel).await?;
        let result = async {
            let item = load_item(&tx, item_id).await?;
            let gate = RevisionGate::open_checked(&tx, &item.list_id, expected_revision).await?;
            let siblings = sibling_keys(
                &tx,
                &item.list_id,
                item.parent_item_id.as_deref(),
                Some(item_id),
            )
            .await?;

            let plan = self.allocator.plan_set_order(&siblings, item_id, new_order);
            let order = self.apply_order_plan(&tx, item_id, &plan).await?;

            Ok::<_, ListStoreError>((item.list_id, order, gate.advance(&tx).await?))
        }
        .await;
        let (list_id, (order, renumbered), new_revision) = tx.finish(result).await?;

        self.emit_event(ListEvent::ItemUpdated {
            list_id,
            item_id: item_id.to_string(),
            revision: new_revision,
        });
        Ok(ReorderOutcome {
            order,
            renumbered,
            new_revision,
        })
    }

    #[tracing::instrument(skip(self, cancel))]
    pub async fn rename_item(
        &self,
        item_id: &str,
        new_name: &str,
        expected_revision: i64,
        cancel: &CancellationToken,
    ) -> Result<MutationOutcome, ListStoreError> {
        let name = normalize_name(new_name)?;

        let tx = self.db.begin_write(cancel).await?;
        let result = async {
            let item = load_item(&tx, item_id).await?;
            let gate = RevisionGate::open_checked(&tx, &item.list_id, expected_revision).await?;
            tx.execute(
                "UPDATE items SET name = ?, updated_at = ? WHERE id = ?",
                params![name.as_str(), now(), item_id],
                "rename item",
            )
            .await?;
            Ok::<_, ListStoreError>((item.list_id, gate.advance(&tx).await?))
        }
        .await;
        let (list_id, new_revision) = tx.finish(result).await?;

        self.emit_event(ListEvent::ItemUpdated {
            list_id,
            item_id: item_id.to_string(),
            revision: new_revision,
        });
        Ok(MutationOutcome { new_revision })
    }

    /// Delete an item and its whole subtree
    #[tracing::instrument(skip(self, cancel))]
    pub async fn delete_item(
        &self,
        item_id: &str,
        expected_revision: i64,
        cancel: &CancellationToken,
    ) -> Result<DeleteOutcome, ListStoreError> {
        let tx = self.db.begin_write(cancel).await?;
        let result = async {
            let item = load_item(&tx, item_id).await?;
            let gate = RevisionGate::open_checked(&tx, &item.list_id, expected_revision).await?;
            let snapshot = load_snapshot(&tx, &item.list_id).await?;
            let mut subtree = snapshot
                .descendants(item_id)
                .map_err(|e| ListStoreError::from_hierarchy(&item.list_id, e))?;

            // Deepest first, so no remaining row points at a deleted parent
            // whether or not the connection enforces ON DELETE CASCADE
            subtree.reverse();
            subtree.push(item_id.to_string());

            let mut removed = 0;
            for id in &subtree {
                removed += tx
                    .execute(
                        "DELETE FROM items WHERE id = ?",
                        params![id.as_str()],
                        "delete item",
                    )
                    .await?;
            }
            if removed == 0 {
                return Err(ListStoreError::item_not_found(item_id));
            }

            Ok::<_, ListStoreError>((item.list_id, removed, gate.advance(&tx).await?))
        }
        .await;
        let (list_id, deleted, new_revision) = tx.finish(result).await?;

        tracing::debug!("Deleted item {} ({} rows)", item_id, deleted);
        self.emit_event(ListEvent::ItemsDeleted {
            list_id,
            root_item_id: item_id.to_string(),
            deleted,
            revision: new_revision,
        });
        Ok(DeleteOutcome {
            deleted,
            new_revision,
        })
    }

    /// Mark an item and every descendant incomplete
    ///
    /// Completed ancestors become incomplete as well. `affected` counts the
    /// subtree items that were completed before the reset.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn reset_subtree(
        &self,
        root_item_id: &str,
        expected_revision: i64,
        cancel: &CancellationToken,
    ) -> Result<ResetOutcome, ListStoreError> {
        let tx = self.db.begin_write(cancel).await?;
        let result = async {
            let item = load_item(&tx, root_item_id).await?;
            let gate = RevisionGate::open_checked(&tx, &item.list_id, expected_revision).await?;
            let snapshot = load_snapshot(&tx, &item.list_id).await?;
            let plan = plan_subtree_reset(&snapshot, root_item_id)
                .map_err(|e| ListStoreError::from_hierarchy(&item.list_id, e))?;

            mark_incomplete(&tx, &plan.subtree).await?;
            mark_incomplete(&tx, &plan.ancestors).await?;

            Ok::<_, ListStoreError>((
                item.list_id,
                plan.completed_in_subtree as u64,
                gate.advance(&tx).await?,
            ))
        }
        .await;
        let (list_id, affected, new_revision) = tx.finish(result).await?;

        self.emit_event(ListEvent::SubtreeReset {
            list_id,
            root_item_id: root_item_id.to_string(),
            affected,
            revision: new_revision,
        });
        Ok(ResetOutcome {
            affected,
            new_revision,
        })
    }

    /// Current revision of a non-deleted list
    pub async fn get_list_revision(
        &self,
        list_id: &str,
        cancel: &CancellationToken,
    ) -> Result<i64, ListStoreError> {
        let tx = self.db.begin_read(cancel).await?;
        let result = RevisionGate::open(&tx, list_id)
            .await
            .map(|gate| gate.revision());
        tx.finish(result).await
    }

    pub async fn get_item(
        &self,
        item_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Item, ListStoreError> {
        let tx = self.db.begin_read(cancel).await?;
        let result = async {
            let item = load_item(&tx, item_id).await?;
            RevisionGate::open(&tx, &item.list_id).await?;
            Ok::<_, ListStoreError>(item)
        }
        .await;
        tx.finish(result).await
    }

    /// The list's items as a depth-first flattened tree
    ///
    /// Siblings are ordered by `(order, created_at, id)`. Each entry carries
    /// its level (root = 1) and completion metadata for rendering.
    pub async fn get_items(
        &self,
        list_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ItemView>, ListStoreError> {
        let tx = self.db.begin_read(cancel).await?;
        let result = async {
            RevisionGate::open(&tx, list_id).await?;
            load_items(&tx, list_id).await
        }
        .await;
        let items = tx.finish(result).await?;

        flatten_items(list_id, items)
    }

    /// Insert an item at the end of its sibling group; returns (id, order)
    async fn insert_item(
        &self,
        tx: &Transaction,
        list_id: &str,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<(String, i64), ListStoreError> {
        let order = self
            .allocator
            .next_after(max_sibling_order(tx, list_id, parent_id).await?)?;
        let item_id = Uuid::new_v4().to_string();
        let created_at = now();

        tx.execute(
            "INSERT INTO items (id, list_id, name, is_completed, parent_item_id, sort_order, created_at, updated_at)
             VALUES (?, ?, ?, 0, ?, ?, ?, ?)",
            params![
                item_id.as_str(),
                list_id,
                name,
                parent_id,
                order,
                created_at.as_str(),
                created_at.as_str()
            ],
            "insert item",
        )
        .await?;

        Ok((item_id, order))
    }

    /// Write an order plan; returns (moving item's key, siblings renumbered)
    async fn apply_order_plan(
        &self,
        tx: &Transaction,
        item_id: &str,
        plan: &OrderPlan,
    ) -> Result<(i64, usize), ListStoreError> {
        match plan {
            OrderPlan::Direct(order) => {
                tx.execute(
                    "UPDATE items SET sort_order = ?, updated_at = ? WHERE id = ?",
                    params![*order, now(), item_id],
                    "set item order",
                )
                .await?;
                Ok((*order, 0))
            }
            OrderPlan::Renumber(keys) => {
                let order = plan
                    .key_for(item_id)
                    .ok_or_else(|| ListStoreError::item_not_found(item_id))?;
                write_order_keys(tx, keys).await?;
                let renumbered = keys.iter().filter(|k| k.id != item_id).count();
                tracing::info!(
                    item_id,
                    renumbered,
                    "Sibling keys exhausted or colliding, renumbered group"
                );
                Ok((order, renumbered))
            }
        }
    }

    fn depth(
        &self,
        snapshot: &HierarchySnapshot,
        list_id: &str,
        item_id: &str,
    ) -> Result<usize, ListStoreError> {
        snapshot
            .depth_of(item_id)
            .map_err(|e| ListStoreError::from_hierarchy(list_id, e))
    }
}

/// Build the depth-first view with per-item child counts
fn flatten_items(list_id: &str, items: Vec<Item>) -> Result<Vec<ItemView>, ListStoreError> {
    let snapshot = HierarchySnapshot::from_nodes(items.iter().map(HierarchyNode::from));
    let order = snapshot
        .flatten()
        .map_err(|e| ListStoreError::from_hierarchy(list_id, e))?;

    let mut by_id: HashMap<String, Item> =
        items.into_iter().map(|item| (item.id.clone(), item)).collect();

    let mut views = Vec::with_capacity(order.len());
    for (id, level) in order {
        let children = snapshot.children_of(Some(id.as_str()));
        let completed_child_count = children
            .iter()
            .filter(|child| snapshot.get(child).is_some_and(|n| n.is_completed))
            .count();
        let Some(item) = by_id.remove(&id) else {
            continue;
        };
        views.push(ItemView {
            level,
            child_count: children.len(),
            completed_child_count,
            state: CompletionState::derive(item.is_completed, completed_child_count),
            item,
        });
    }
    Ok(views)
}

#[cfg(test)]
#[path = "tree_repository_test.rs"]
mod tree_repository_test;
