//! Domain Events for the list store
//!
//! The store publishes a [`ListEvent`] on a tokio broadcast channel after every
//! committed operation. Each event carries the list's new revision, so a
//! subscriber that tracks the last revision it rendered can decide whether it
//! needs to re-fetch.
//!
//! # Event Flow
//!
//! 1. A store operation commits its transaction
//! 2. The matching event is sent on the broadcast channel
//! 3. All subscribers receive the event asynchronously
//!
//! Events are never sent for rolled-back or rejected operations.

use serde::{Deserialize, Serialize};

/// Domain events emitted by `ListStore`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ListEvent {
    /// A list was created (revision 0)
    #[serde(rename_all = "camelCase")]
    ListCreated { list_id: String, revision: i64 },

    /// List metadata changed (name, daily flag, restore, daily reset)
    #[serde(rename_all = "camelCase")]
    ListChanged { list_id: String, revision: i64 },

    /// A list was soft-deleted
    #[serde(rename_all = "camelCase")]
    ListDeleted { list_id: String, revision: i64 },

    /// An item was inserted
    #[serde(rename_all = "camelCase")]
    ItemCreated {
        list_id: String,
        item_id: String,
        parent_item_id: Option<String>,
        revision: i64,
    },

    /// An item was renamed or reordered
    #[serde(rename_all = "camelCase")]
    ItemUpdated {
        list_id: String,
        item_id: String,
        revision: i64,
    },

    /// An item changed parent
    #[serde(rename_all = "camelCase")]
    ItemMoved {
        list_id: String,
        item_id: String,
        new_parent_item_id: Option<String>,
        revision: i64,
    },

    /// An item and its subtree were deleted
    #[serde(rename_all = "camelCase")]
    ItemsDeleted {
        list_id: String,
        root_item_id: String,
        deleted: u64,
        revision: i64,
    },

    /// Completion flags changed (including propagated ancestors)
    #[serde(rename_all = "camelCase")]
    CompletionChanged {
        list_id: String,
        item_id: String,
        completed: bool,
        revision: i64,
    },

    /// A subtree was reset to incomplete
    #[serde(rename_all = "camelCase")]
    SubtreeReset {
        list_id: String,
        root_item_id: String,
        affected: u64,
        revision: i64,
    },
}

impl ListEvent {
    /// List the event belongs to
    pub fn list_id(&self) -> &str {
        match self {
            Self::ListCreated { list_id, .. }
            | Self::ListChanged { list_id, .. }
            | Self::ListDeleted { list_id, .. }
            | Self::ItemCreated { list_id, .. }
            | Self::ItemUpdated { list_id, .. }
            | Self::ItemMoved { list_id, .. }
            | Self::ItemsDeleted { list_id, .. }
            | Self::CompletionChanged { list_id, .. }
            | Self::SubtreeReset { list_id, .. } => list_id,
        }
    }

    /// Revision of the list after the change
    pub fn revision(&self) -> i64 {
        match self {
            Self::ListCreated { revision, .. }
            | Self::ListChanged { revision, .. }
            | Self::ListDeleted { revision, .. }
            | Self::ItemCreated { revision, .. }
            | Self::ItemUpdated { revision, .. }
            | Self::ItemMoved { revision, .. }
            | Self::ItemsDeleted { revision, .. }
            | Self::CompletionChanged { revision, .. }
            | Self::SubtreeReset { revision, .. } => *revision,
        }
    }

    /// Get a string representation of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ListCreated { .. } => "list:created",
            Self::ListChanged { .. } => "list:changed",
            Self::ListDeleted { .. } => "list:deleted",
            Self::ItemCreated { .. } => "item:created",
            Self::ItemUpdated { .. } => "item:updated",
            Self::ItemMoved { .. } => "item:moved",
            Self::ItemsDeleted { .. } => "item:deleted",
            Self::CompletionChanged { .. } => "item:completion",
            Self::SubtreeReset { .. } => "item:reset",
        }
    }
}
