//! Data Models
//!
//! This module contains the data structures persisted by the list store:
//!
//! - `TodoList` - user-owned container carrying the revision counter
//! - `Item` - one to-do entry in a list's item tree
//! - `ItemView` - an item plus derived level and completion metadata
//!
//! Input validation shared by both lives in `validation`.

mod item;
mod list;
mod validation;

pub use item::{CompletionState, Item, ItemView};
pub(crate) use item::ITEM_COLUMNS;
pub(crate) use list::{format_timestamp, DATE_FORMAT, LIST_COLUMNS};
pub use list::TodoList;
pub use validation::{normalize_name, require_id, ValidationError, MAX_NAME_LENGTH};
