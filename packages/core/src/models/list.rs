//! List records
//!
//! A [`TodoList`] is a user-owned container of items. Its `revision` is the
//! optimistic-concurrency token for every mutation of the list or its items.

use crate::db::DatabaseError;
use chrono::{DateTime, NaiveDate, Utc};
use libsql::Row;
use serde::{Deserialize, Serialize};

/// Column list matching [`TodoList::from_row`]
pub(crate) const LIST_COLUMNS: &str =
    "id, user_id, name, is_daily, last_reset_date, is_deleted, deleted_at, revision, created_at, updated_at";

/// Date format used for `last_reset_date`
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

/// A named, user-owned list of items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoList {
    pub id: String,

    /// Owning user (opaque reference to the external user store)
    pub user_id: String,

    pub name: String,

    /// Items are reset to incomplete once per calendar day
    pub is_daily: bool,

    /// Day of the most recent daily reset
    pub last_reset_date: Option<NaiveDate>,

    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,

    /// Optimistic-concurrency token, starts at 0
    pub revision: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TodoList {
    /// Whether a daily reset is due on `today`
    pub fn needs_daily_reset(&self, today: NaiveDate) -> bool {
        self.is_daily
            && !self.is_deleted
            && self.last_reset_date.map_or(true, |last| last < today)
    }

    /// Decode a row selected with [`LIST_COLUMNS`]
    pub(crate) fn from_row(row: &Row) -> Result<Self, DatabaseError> {
        let corrupt = |e: libsql::Error| DatabaseError::corrupt_row("lists", e.to_string());

        let last_reset: Option<String> = row.get(4).map_err(corrupt)?;
        let deleted_at: Option<String> = row.get(6).map_err(corrupt)?;
        let created_at: String = row.get(8).map_err(corrupt)?;
        let updated_at: String = row.get(9).map_err(corrupt)?;

        Ok(Self {
            id: row.get(0).map_err(corrupt)?,
            user_id: row.get(1).map_err(corrupt)?,
            name: row.get(2).map_err(corrupt)?,
            is_daily: row.get::<i64>(3).map_err(corrupt)? != 0,
            last_reset_date: last_reset.as_deref().map(parse_date).transpose()?,
            is_deleted: row.get::<i64>(5).map_err(corrupt)? != 0,
            deleted_at: deleted_at.as_deref().map(parse_timestamp).transpose()?,
            revision: row.get(7).map_err(corrupt)?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }
}

/// Parse an RFC 3339 timestamp column
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| DatabaseError::corrupt_row("timestamp", format!("'{}': {}", raw, e)))
}

fn parse_date(raw: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| DatabaseError::corrupt_row("lists", format!("bad date '{}': {}", raw, e)))
}

/// Render a timestamp for storage
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}
