//! Completion rollup planning
//!
//! Pure functions over a [`HierarchySnapshot`] that decide which items change
//! completion state. The service layer turns the resulting plan into UPDATE
//! statements inside the mutation's transaction.

use crate::operations::hierarchy::{HierarchyError, HierarchySnapshot};

/// Items whose completion flag changes, in application order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionWrites {
    /// Mark complete (with the acting user's attribution)
    pub complete: Vec<String>,
    /// Mark incomplete (attribution cleared)
    pub incomplete: Vec<String>,
}

impl CompletionWrites {
    pub fn affected(&self) -> usize {
        self.complete.len() + self.incomplete.len()
    }
}

/// Outcome of planning a completion toggle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionPlan {
    /// The item already has the requested state
    Unchanged,

    /// Completion refused: these direct children are still incomplete
    Blocked { incomplete_children: Vec<String> },

    Apply(CompletionWrites),
}

/// Plan setting `item_id` to `completed`
pub fn plan_completion(
    snapshot: &HierarchySnapshot,
    item_id: &str,
    completed: bool,
) -> Result<CompletionPlan, HierarchyError> {
    let item = snapshot
        .get(item_id)
        .ok_or_else(|| HierarchyError::UnknownItem(item_id.to_string()))?;

    if item.is_completed == completed {
        return Ok(CompletionPlan::Unchanged);
    }

    if !completed {
        let mut incomplete = vec![item_id.to_string()];
        incomplete.extend(completed_ancestors(snapshot, item_id)?);
        return Ok(CompletionPlan::Apply(CompletionWrites {
            complete: Vec::new(),
            incomplete,
        }));
    }

    let blocking = incomplete_children(snapshot, item_id, &[]);
    if !blocking.is_empty() {
        return Ok(CompletionPlan::Blocked {
            incomplete_children: blocking,
        });
    }

    let mut complete = vec![item_id.to_string()];
    for ancestor_id in snapshot.ancestors(item_id)? {
        let already = snapshot.get(&ancestor_id).is_some_and(|n| n.is_completed);
        if already || !incomplete_children(snapshot, &ancestor_id, &complete).is_empty() {
            break;
        }
        complete.push(ancestor_id);
    }

    Ok(CompletionPlan::Apply(CompletionWrites {
        complete,
        incomplete: Vec::new(),
    }))
}

/// What a subtree reset clears
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetPlan {
    /// Every item of the subtree, root first
    pub subtree: Vec<String>,

    /// Items of the subtree that were completed before the reset
    pub completed_in_subtree: usize,

    /// Completed ancestors of the root, which the reset makes incomplete
    pub ancestors: Vec<String>,
}

/// Plan resetting the subtree rooted at `root_id`
pub fn plan_subtree_reset(
    snapshot: &HierarchySnapshot,
    root_id: &str,
) -> Result<ResetPlan, HierarchyError> {
    let mut subtree = vec![root_id.to_string()];
    subtree.extend(snapshot.descendants(root_id)?);

    let completed_in_subtree = subtree
        .iter()
        .filter(|id| snapshot.get(id).is_some_and(|n| n.is_completed))
        .count();

    Ok(ResetPlan {
        subtree,
        completed_in_subtree,
        ancestors: completed_ancestors(snapshot, root_id)?,
    })
}

/// Items to mark incomplete when an incomplete item lands under `parent_id`
///
/// Returns `parent_id` itself (if completed) followed by its completed
/// ancestors. Used for both new children and moved subtrees.
pub fn plan_incomplete_arrival(
    snapshot: &HierarchySnapshot,
    parent_id: &str,
) -> Result<Vec<String>, HierarchyError> {
    let parent = snapshot
        .get(parent_id)
        .ok_or_else(|| HierarchyError::UnknownItem(parent_id.to_string()))?;

    let mut out = Vec::new();
    if parent.is_completed {
        out.push(parent_id.to_string());
    }
    out.extend(completed_ancestors(snapshot, parent_id)?);
    Ok(out)
}

fn completed_ancestors(
    snapshot: &HierarchySnapshot,
    id: &str,
) -> Result<Vec<String>, HierarchyError> {
    Ok(snapshot
        .ancestors(id)?
        .into_iter()
        .filter(|a| snapshot.get(a).is_some_and(|n| n.is_completed))
        .collect())
}

/// Direct children of `parent_id` that are incomplete, ignoring any in `done`
fn incomplete_children(
    snapshot: &HierarchySnapshot,
    parent_id: &str,
    done: &[String],
) -> Vec<String> {
    snapshot
        .children_of(Some(parent_id))
        .iter()
        .filter(|child| !done.contains(child))
        .filter(|child| snapshot.get(child).is_some_and(|n| !n.is_completed))
        .cloned()
        .collect()
}
