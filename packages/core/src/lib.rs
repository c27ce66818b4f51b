//! Listkeeper Core: Hierarchical List Store
//!
//! This crate provides the persistence and business rules behind a
//! hierarchical to-do list: user-owned lists whose items form a bounded-depth
//! tree, with every mutation guarded by a per-list revision counter.
//!
//! # Architecture
//!
//! - **Optimistic concurrency**: callers submit the revision they observed;
//!   a stale revision fails with `RevisionMismatch` and changes nothing
//! - **One transaction per operation**: check, write, rollup and revision
//!   bump commit or roll back together
//! - **Sparse ordering**: sibling keys spaced 1024 apart, renumbered locally
//!   when a gap is exhausted
//! - **libsql**: embedded SQLite-compatible file or remote endpoint
//!
//! # Modules
//!
//! - [`config`] - Explicit store and database configuration
//! - [`models`] - Data structures (TodoList, Item, ItemView)
//! - [`operations`] - Pure planners (ordering, hierarchy walks, completion)
//! - [`services`] - ListStore and its outcome types
//! - [`db`] - Database layer with libsql integration and migrations

pub mod config;
pub mod db;
pub mod models;
pub mod operations;
pub mod services;

// Re-export commonly used types
pub use config::StoreConfig;
pub use db::{DatabaseError, DatabaseService, ListEvent};
pub use models::*;
pub use services::*;
pub use tokio_util::sync::CancellationToken;
