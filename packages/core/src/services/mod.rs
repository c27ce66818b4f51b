//! Business Services
//!
//! This module contains the list store and its supporting pieces:
//!
//! - `ListStore` - list lifecycle, item tree mutations, completion rollup
//! - `RevisionGate` - per-list optimistic concurrency inside each transaction
//! - Outcome types returned by every mutation
//!
//! Services coordinate between the database layer and the pure planners in
//! [`operations`](crate::operations), enforcing the tree rules inside one
//! transaction per operation.

mod completion;
pub mod error;
pub mod list_store;
pub mod outcome;
mod queries;
mod revision_gate;
mod tree_repository;

pub use error::{EntityKind, ListStoreError};
pub use list_store::ListStore;
pub use outcome::{
    CompletionChange, DailyReset, DeleteOutcome, ItemCreated, MoveOutcome, MutationOutcome,
    ReorderOutcome, ResetOutcome,
};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::StoreConfig;
    use crate::db::{migrations, DatabaseService};
    use crate::services::ListStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Helper to create a migrated store on a fresh database file
    /// Returns (store, _temp_dir) - temp_dir must be kept alive for test duration
    pub(crate) async fn create_test_store() -> (ListStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig::local(temp_dir.path().join("test.db"));
        let db = Arc::new(DatabaseService::open(&config.database).await.unwrap());
        migrations::run(&db).await.unwrap();
        let store = ListStore::new(db, &config).await.unwrap();
        (store, temp_dir)
    }
}
