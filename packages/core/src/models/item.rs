//! Item records and the flattened tree view
//!
//! An [`Item`] is one to-do entry. `parent_item_id = None` marks a root item.
//! Depth is never stored; it is derived from the parent chain when a list is
//! read (see [`ItemView::level`]).

use crate::db::DatabaseError;
use crate::models::list::parse_timestamp;
use chrono::{DateTime, Utc};
use libsql::Row;
use serde::{Deserialize, Serialize};

/// Column list matching [`Item::from_row`]
pub(crate) const ITEM_COLUMNS: &str =
    "id, list_id, name, is_completed, parent_item_id, sort_order, completed_by_user_id, created_at, updated_at";

/// A single to-do entry, optionally nested under a parent item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub list_id: String,
    pub name: String,
    pub is_completed: bool,

    /// Parent item (None = root of the list)
    pub parent_item_id: Option<String>,

    /// Sparse sibling order key (unique only among siblings)
    pub order: i64,

    /// User who completed the item (cleared when it becomes incomplete)
    pub completed_by_user_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn is_root(&self) -> bool {
        self.parent_item_id.is_none()
    }

    /// Decode a row selected with [`ITEM_COLUMNS`]
    pub(crate) fn from_row(row: &Row) -> Result<Self, DatabaseError> {
        let corrupt = |e: libsql::Error| DatabaseError::corrupt_row("items", e.to_string());

        let created_at: String = row.get(7).map_err(corrupt)?;
        let updated_at: String = row.get(8).map_err(corrupt)?;

        Ok(Self {
            id: row.get(0).map_err(corrupt)?,
            list_id: row.get(1).map_err(corrupt)?,
            name: row.get(2).map_err(corrupt)?,
            is_completed: row.get::<i64>(3).map_err(corrupt)? != 0,
            parent_item_id: row.get(4).map_err(corrupt)?,
            order: row.get(5).map_err(corrupt)?,
            completed_by_user_id: row.get(6).map_err(corrupt)?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }
}

/// Display state derived from an item's flag and its children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionState {
    Incomplete,
    /// Not complete, but at least one direct child is
    Partial,
    Complete,
}

impl CompletionState {
    pub fn derive(is_completed: bool, completed_children: usize) -> Self {
        if is_completed {
            Self::Complete
        } else if completed_children > 0 {
            Self::Partial
        } else {
            Self::Incomplete
        }
    }
}

/// One entry of the depth-first flattened tree returned by `get_items`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    #[serde(flatten)]
    pub item: Item,

    /// Depth in the tree (root = 1)
    pub level: usize,

    pub child_count: usize,
    pub completed_child_count: usize,
    pub state: CompletionState,
}

impl ItemView {
    pub fn id(&self) -> &str {
        &self.item.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_state_derivation() {
        assert_eq!(CompletionState::derive(false, 0), CompletionState::Incomplete);
        assert_eq!(CompletionState::derive(false, 2), CompletionState::Partial);
        assert_eq!(CompletionState::derive(true, 0), CompletionState::Complete);
        assert_eq!(CompletionState::derive(true, 3), CompletionState::Complete);
    }
}
