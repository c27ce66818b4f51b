//! Results returned by store mutations
//!
//! Every successful mutation reports the list's new revision so the caller
//! can chain the next mutation without re-reading.

use serde::{Deserialize, Serialize};

/// A mutation that only reports the new revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationOutcome {
    pub new_revision: i64,
}

/// A newly inserted item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemCreated {
    pub item_id: String,
    pub order: i64,
    pub new_revision: i64,
}

/// Result of a parent change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveOutcome {
    /// False when the item already had the requested parent; the revision
    /// is then the unchanged current one
    pub moved: bool,
    pub new_revision: i64,
}

/// Result of a sibling reorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderOutcome {
    /// Key the item ended up with
    pub order: i64,
    /// Other siblings whose keys were rewritten to make room
    pub renumbered: usize,
    pub new_revision: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    /// Rows removed: the item plus every descendant
    pub deleted: u64,
    pub new_revision: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetOutcome {
    /// Items of the subtree that were completed before the reset
    pub affected: u64,
    pub new_revision: i64,
}

/// Result of a completion toggle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum CompletionChange {
    /// State changed; `affected` counts the item plus every rolled-up ancestor
    #[serde(rename_all = "camelCase")]
    Applied { new_revision: i64, affected: u64 },

    /// Already in the requested state; revision not bumped
    Unchanged,

    /// Completion refused until these direct children are complete
    #[serde(rename_all = "camelCase")]
    BlockedByChildren { incomplete_children: Vec<String> },
}

impl CompletionChange {
    pub fn new_revision(&self) -> Option<i64> {
        match self {
            Self::Applied { new_revision, .. } => Some(*new_revision),
            _ => None,
        }
    }
}

/// One list processed by a daily reset pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReset {
    pub list_id: String,
    pub items_reset: u64,
    pub new_revision: i64,
}
