//! Database Layer
//!
//! This module handles all database interactions using libsql:
//!
//! - Database handle and connection management ([`DatabaseService`])
//! - Cancellable transactions ([`Transaction`])
//! - Explicit, versioned schema migrations ([`migrations`])
//! - Domain events published after commits ([`ListEvent`])
//!
//! # Architecture
//!
//! libsql gives the store an embedded SQLite file for local use and the same
//! SQL dialect against a managed remote endpoint. All cross-call coordination
//! goes through the persisted per-list revision counter; the database layer
//! holds no mutable in-process state.

pub mod database;
mod error;
pub mod events;
pub mod migrations;
pub mod transaction;

pub use database::DatabaseService;
pub use error::DatabaseError;
pub use events::ListEvent;
pub use transaction::{Transaction, TransactionMode};
