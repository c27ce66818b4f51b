//! Statements shared by the store operations
//!
//! Every function runs on the caller's open [`Transaction`], so reads observe
//! the same snapshot the mutation writes against.

use crate::db::Transaction;
use crate::models::{format_timestamp, Item, ITEM_COLUMNS};
use crate::operations::{HierarchyNode, HierarchySnapshot, SiblingKey};
use crate::services::error::ListStoreError;
use chrono::Utc;
use libsql::params;

pub(crate) fn now() -> String {
    format_timestamp(Utc::now())
}

/// Load one item or fail with `NotFound`
pub(crate) async fn load_item(tx: &Transaction, item_id: &str) -> Result<Item, ListStoreError> {
    let row = tx
        .query_opt(
            &format!("SELECT {} FROM items WHERE id = ?", ITEM_COLUMNS),
            params![item_id],
            "load item",
        )
        .await?
        .ok_or_else(|| ListStoreError::item_not_found(item_id))?;
    Ok(Item::from_row(&row)?)
}

/// Every item of a list in sibling display order
pub(crate) async fn load_items(tx: &Transaction, list_id: &str) -> Result<Vec<Item>, ListStoreError> {
    tx.query_map(
        &format!(
            "SELECT {} FROM items WHERE list_id = ? ORDER BY sort_order, created_at, id",
            ITEM_COLUMNS
        ),
        params![list_id],
        "load list items",
        |row| Item::from_row(row).map_err(ListStoreError::from),
    )
    .await
}

pub(crate) async fn load_snapshot(
    tx: &Transaction,
    list_id: &str,
) -> Result<HierarchySnapshot, ListStoreError> {
    let items = load_items(tx, list_id).await?;
    Ok(HierarchySnapshot::from_nodes(
        items.iter().map(HierarchyNode::from),
    ))
}

/// Keys of the children of `parent` (None = roots), in display order,
/// optionally leaving one item out
pub(crate) async fn sibling_keys(
    tx: &Transaction,
    list_id: &str,
    parent: Option<&str>,
    exclude: Option<&str>,
) -> Result<Vec<SiblingKey>, ListStoreError> {
    let keys = tx
        .query_map(
            "SELECT id, sort_order FROM items
             WHERE list_id = ? AND parent_item_id IS ?
             ORDER BY sort_order, created_at, id",
            params![list_id, parent],
            "load sibling keys",
            |row| Ok::<_, ListStoreError>(SiblingKey::new(row.get::<String>(0)?, row.get::<i64>(1)?)),
        )
        .await?;

    Ok(keys
        .into_iter()
        .filter(|key| exclude != Some(key.id.as_str()))
        .collect())
}

pub(crate) async fn max_sibling_order(
    tx: &Transaction,
    list_id: &str,
    parent: Option<&str>,
) -> Result<Option<i64>, ListStoreError> {
    let row = tx
        .query_opt(
            "SELECT MAX(sort_order) FROM items WHERE list_id = ? AND parent_item_id IS ?",
            params![list_id, parent],
            "read max sibling order",
        )
        .await?;
    match row {
        Some(row) => Ok(row.get::<Option<i64>>(0)?),
        None => Ok(None),
    }
}

pub(crate) async fn write_order_keys(
    tx: &Transaction,
    keys: &[SiblingKey],
) -> Result<(), ListStoreError> {
    let updated_at = now();
    for key in keys {
        tx.execute(
            "UPDATE items SET sort_order = ?, updated_at = ? WHERE id = ?",
            params![key.order, updated_at.as_str(), key.id.as_str()],
            "write sibling order",
        )
        .await?;
    }
    Ok(())
}

/// Mark items complete, attributed to `user_id`
pub(crate) async fn mark_complete(
    tx: &Transaction,
    ids: &[String],
    user_id: &str,
) -> Result<(), ListStoreError> {
    let updated_at = now();
    for id in ids {
        tx.execute(
            "UPDATE items SET is_completed = 1, completed_by_user_id = ?, updated_at = ? WHERE id = ?",
            params![user_id, updated_at.as_str(), id.as_str()],
            "mark item complete",
        )
        .await?;
    }
    Ok(())
}

/// Mark items incomplete and clear their attribution
pub(crate) async fn mark_incomplete(tx: &Transaction, ids: &[String]) -> Result<(), ListStoreError> {
    let updated_at = now();
    for id in ids {
        tx.execute(
            "UPDATE items SET is_completed = 0, completed_by_user_id = NULL, updated_at = ? WHERE id = ?",
            params![updated_at.as_str(), id.as_str()],
            "mark item incomplete",
        )
        .await?;
    }
    Ok(())
}
