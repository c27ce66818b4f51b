//! List Store
//!
//! [`ListStore`] is the entry point for every list and item operation. It owns
//! the database handle, the ordering allocator, the depth limit, and the
//! event channel. It holds no other state: all coordination between callers
//! goes through the persisted per-list revision.
//!
//! Item operations live in `tree_repository` and completion toggles in
//! `completion`; this file holds construction, events and the list lifecycle.
//!
//! # Mutation pattern
//!
//! 1. Open a write transaction (`BEGIN IMMEDIATE`)
//! 2. Open the [`RevisionGate`] for the list (checked or unchecked)
//! 3. Validate everything against in-transaction reads
//! 4. Write, then advance the revision exactly once
//! 5. Commit, then emit a [`ListEvent`]

use crate::config::StoreConfig;
use crate::db::{migrations, DatabaseService, ListEvent, Transaction};
use crate::models::{normalize_name, require_id, TodoList, DATE_FORMAT, LIST_COLUMNS};
use crate::operations::SparseOrderAllocator;
use crate::services::error::ListStoreError;
use crate::services::outcome::{DailyReset, MutationOutcome};
use crate::services::queries::now;
use crate::services::revision_gate::RevisionGate;
use chrono::NaiveDate;
use libsql::params;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Hierarchical list store over a libsql database
#[derive(Clone)]
pub struct ListStore {
    pub(crate) db: Arc<DatabaseService>,
    pub(crate) allocator: SparseOrderAllocator,
    pub(crate) max_depth: usize,

    /// Broadcast channel for domain events
    event_tx: broadcast::Sender<ListEvent>,
}

impl std::fmt::Debug for ListStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListStore")
            .field("db", &self.db)
            .field("allocator", &self.allocator)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl ListStore {
    /// Create a store over an opened, migrated database
    ///
    /// The store never creates tables. If the schema is behind this build,
    /// construction fails with `SchemaOutdated`; run
    /// [`migrations::run`](crate::db::migrations::run) first. A config that
    /// fails [`StoreConfig::validate`] is rejected with `Config`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use listkeeper_core::config::StoreConfig;
    /// # use listkeeper_core::db::{migrations, DatabaseService};
    /// # use listkeeper_core::services::ListStore;
    /// # use std::sync::Arc;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = StoreConfig::local("./data/lists.db");
    /// let db = Arc::new(DatabaseService::open(&config.database).await?);
    /// migrations::run(&db).await?;
    /// let store = ListStore::new(db, &config).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(db: Arc<DatabaseService>, config: &StoreConfig) -> Result<Self, ListStoreError> {
        config.validate()?;
        migrations::ensure_current(&db).await?;

        let (event_tx, _) = broadcast::channel(config.event_channel_capacity);

        Ok(Self {
            db,
            allocator: SparseOrderAllocator::new(config.limits.order_step),
            max_depth: config.limits.max_depth,
            event_tx,
        })
    }

    pub fn database(&self) -> &Arc<DatabaseService> {
        &self.db
    }

    /// Subscribe to events for every committed mutation
    pub fn subscribe_to_events(&self) -> broadcast::Receiver<ListEvent> {
        self.event_tx.subscribe()
    }

    /// Ignores errors if no subscribers
    pub(crate) fn emit_event(&self, event: ListEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Create an empty list at revision 0
    #[tracing::instrument(skip(self, cancel))]
    pub async fn create_list(
        &self,
        user_id: &str,
        name: &str,
        is_daily: bool,
        cancel: &CancellationToken,
    ) -> Result<TodoList, ListStoreError> {
        require_id(user_id, "user_id")?;
        let name = normalize_name(name)?;
        let list_id = Uuid::new_v4().to_string();

        let tx = self.db.begin_write(cancel).await?;
        let result = async {
            let created_at = now();
            tx.execute(
                "INSERT INTO lists (id, user_id, name, is_daily, revision, created_at, updated_at)
                 VALUES (?, ?, ?, ?, 0, ?, ?)",
                params![
                    list_id.as_str(),
                    user_id,
                    name.as_str(),
                    is_daily as i64,
                    created_at.as_str(),
                    created_at.as_str()
                ],
                "insert list",
            )
            .await?;
            Ok::<_, ListStoreError>(RevisionGate::open(&tx, &list_id).await?.list().clone())
        }
        .await;
        let list = tx.finish(result).await?;

        tracing::debug!("Created list {}", list.id);
        self.emit_event(ListEvent::ListCreated {
            list_id: list.id.clone(),
            revision: list.revision,
        });
        Ok(list)
    }

    /// Fetch a non-deleted list
    pub async fn get_list(
        &self,
        list_id: &str,
        cancel: &CancellationToken,
    ) -> Result<TodoList, ListStoreError> {
        let tx = self.db.begin_read(cancel).await?;
        let result = RevisionGate::open(&tx, list_id)
            .await
            .map(|gate| gate.list().clone());
        tx.finish(result).await
    }

    /// A user's non-deleted lists, oldest first
    pub async fn lists_for_user(
        &self,
        user_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<TodoList>, ListStoreError> {
        let tx = self.db.begin_read(cancel).await?;
        let result = tx
            .query_map(
                &format!(
                    "SELECT {} FROM lists WHERE user_id = ? AND is_deleted = 0
                     ORDER BY created_at, id",
                    LIST_COLUMNS
                ),
                params![user_id],
                "load user lists",
                |row| TodoList::from_row(row).map_err(ListStoreError::from),
            )
            .await;
        tx.finish(result).await
    }

    #[tracing::instrument(skip(self, cancel))]
    pub async fn rename_list(
        &self,
        list_id: &str,
        name: &str,
        expected_revision: i64,
        cancel: &CancellationToken,
    ) -> Result<MutationOutcome, ListStoreError> {
        let name = normalize_name(name)?;

        let tx = self.db.begin_write(cancel).await?;
        let result = async {
            let gate = RevisionGate::open_checked(&tx, list_id, expected_revision).await?;
            tx.execute(
                "UPDATE lists SET name = ? WHERE id = ?",
                params![name.as_str(), list_id],
                "rename list",
            )
            .await?;
            gate.advance(&tx).await
        }
        .await;
        let new_revision = tx.finish(result).await?;

        self.emit_event(ListEvent::ListChanged {
            list_id: list_id.to_string(),
            revision: new_revision,
        });
        Ok(MutationOutcome { new_revision })
    }

    #[tracing::instrument(skip(self, cancel))]
    pub async fn set_list_daily(
        &self,
        list_id: &str,
        is_daily: bool,
        expected_revision: i64,
        cancel: &CancellationToken,
    ) -> Result<MutationOutcome, ListStoreError> {
        let tx = self.db.begin_write(cancel).await?;
        let result = async {
            let gate = RevisionGate::open_checked(&tx, list_id, expected_revision).await?;
            tx.execute(
                "UPDATE lists SET is_daily = ? WHERE id = ?",
                params![is_daily as i64, list_id],
                "update daily flag",
            )
            .await?;
            gate.advance(&tx).await
        }
        .await;
        let new_revision = tx.finish(result).await?;

        self.emit_event(ListEvent::ListChanged {
            list_id: list_id.to_string(),
            revision: new_revision,
        });
        Ok(MutationOutcome { new_revision })
    }

    /// Soft-delete a list; its items stay in place but become unreachable
    #[tracing::instrument(skip(self, cancel))]
    pub async fn soft_delete_list(
        &self,
        list_id: &str,
        expected_revision: i64,
        cancel: &CancellationToken,
    ) -> Result<MutationOutcome, ListStoreError> {
        let tx = self.db.begin_write(cancel).await?;
        let result = async {
            let gate = RevisionGate::open_checked(&tx, list_id, expected_revision).await?;
            tx.execute(
                "UPDATE lists SET is_deleted = 1, deleted_at = ? WHERE id = ?",
                params![now(), list_id],
                "soft delete list",
            )
            .await?;
            gate.advance(&tx).await
        }
        .await;
        let new_revision = tx.finish(result).await?;

        tracing::info!("Soft-deleted list {}", list_id);
        self.emit_event(ListEvent::ListDeleted {
            list_id: list_id.to_string(),
            revision: new_revision,
        });
        Ok(MutationOutcome { new_revision })
    }

    /// Undo a soft delete
    ///
    /// Restoring a list that is not deleted succeeds without a revision bump.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn restore_list(
        &self,
        list_id: &str,
        cancel: &CancellationToken,
    ) -> Result<MutationOutcome, ListStoreError> {
        let tx = self.db.begin_write(cancel).await?;
        let result = async {
            let gate = RevisionGate::open_including_deleted(&tx, list_id).await?;
            if !gate.list().is_deleted {
                return Ok((gate.revision(), false));
            }
            tx.execute(
                "UPDATE lists SET is_deleted = 0, deleted_at = NULL WHERE id = ?",
                params![list_id],
                "restore list",
            )
            .await?;
            Ok::<_, ListStoreError>((gate.advance(&tx).await?, true))
        }
        .await;
        let (new_revision, restored) = tx.finish(result).await?;

        if restored {
            self.emit_event(ListEvent::ListChanged {
                list_id: list_id.to_string(),
                revision: new_revision,
            });
        }
        Ok(MutationOutcome { new_revision })
    }

    /// Reset one daily list if it has not been reset on `today`
    ///
    /// Returns `None` when the list is not daily or was already reset.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn run_daily_reset(
        &self,
        list_id: &str,
        today: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<Option<DailyReset>, ListStoreError> {
        let tx = self.db.begin_write(cancel).await?;
        let result = self.daily_reset_in(&tx, list_id, today).await;
        let reset = tx.finish(result).await?;

        if let Some(reset) = &reset {
            self.emit_event(ListEvent::ListChanged {
                list_id: reset.list_id.clone(),
                revision: reset.new_revision,
            });
        }
        Ok(reset)
    }

    /// Reset every daily list that is due on `today`
    ///
    /// Each list is reset in its own transaction. On cancellation, lists
    /// already processed stay reset.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn run_daily_resets(
        &self,
        today: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<Vec<DailyReset>, ListStoreError> {
        let tx = self.db.begin_read(cancel).await?;
        let result = tx
            .query_map(
                "SELECT id FROM lists
                 WHERE is_daily = 1 AND is_deleted = 0
                   AND (last_reset_date IS NULL OR last_reset_date < ?)
                 ORDER BY created_at, id",
                params![today.format(DATE_FORMAT).to_string()],
                "find due daily lists",
                |row| row.get::<String>(0).map_err(ListStoreError::from),
            )
            .await;
        let due = tx.finish(result).await?;

        let mut resets = Vec::with_capacity(due.len());
        for list_id in due {
            match self.run_daily_reset(&list_id, today, cancel).await {
                Ok(Some(reset)) => resets.push(reset),
                Ok(None) => {}
                // Soft-deleted since the due scan
                Err(ListStoreError::NotFound { .. }) => {
                    tracing::debug!("Daily reset skipped list {} (no longer available)", list_id);
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!("Daily reset for {} processed {} lists", today, resets.len());
        Ok(resets)
    }

    async fn daily_reset_in(
        &self,
        tx: &Transaction,
        list_id: &str,
        today: NaiveDate,
    ) -> Result<Option<DailyReset>, ListStoreError> {
        let gate = RevisionGate::open(tx, list_id).await?;
        if !gate.list().needs_daily_reset(today) {
            return Ok(None);
        }

        let updated_at = now();
        let items_reset = tx
            .execute(
                "UPDATE items SET is_completed = 0, completed_by_user_id = NULL, updated_at = ?
                 WHERE list_id = ? AND is_completed = 1",
                params![updated_at.as_str(), list_id],
                "reset daily list items",
            )
            .await?;
        tx.execute(
            "UPDATE lists SET last_reset_date = ? WHERE id = ?",
            params![today.format(DATE_FORMAT).to_string(), list_id],
            "record daily reset",
        )
        .await?;

        let new_revision = gate.advance(tx).await?;
        Ok(Some(DailyReset {
            list_id: list_id.to_string(),
            items_reset,
            new_revision,
        }))
    }
}

#[cfg(test)]
#[path = "list_store_test.rs"]
mod list_store_test;
