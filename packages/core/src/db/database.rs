//! Database Connection Management
//!
//! This module provides the database handle used by the list store. It opens
//! a libsql database (embedded file or remote endpoint) from an explicit
//! [`DatabaseConfig`] and hands out per-operation connections.
//!
//! # Architecture
//!
//! - **Explicit configuration**: endpoint and credentials come from the caller
//! - **No implicit schema work**: opening never creates tables; see
//!   [`migrations`](crate::db::migrations)
//! - **WAL mode**: Write-Ahead Logging for concurrent readers
//! - **Foreign keys**: enabled on every connection (item subtrees cascade)
//!
//! # Database Connection Patterns
//!
//! **ALWAYS use `connect_with_timeout()` in async functions.** Each store
//! operation takes a fresh connection so transactions never share state across
//! tasks.
//!
//! ```no_run
//! # use listkeeper_core::config::DatabaseConfig;
//! # use listkeeper_core::db::DatabaseService;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db = DatabaseService::open(&DatabaseConfig::local("./data/lists.db")).await?;
//! let conn = db.connect_with_timeout().await?;
//! # Ok(())
//! # }
//! ```

use crate::config::{DatabaseConfig, DatabaseTarget};
use crate::db::error::DatabaseError;
use crate::db::transaction::{Transaction, TransactionMode};
use libsql::{Builder, Database};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Database service for managing the libsql handle
#[derive(Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Where the database lives (credentials redacted in Debug)
    pub target: DatabaseTarget,

    busy_timeout_ms: u64,
}

impl std::fmt::Debug for DatabaseService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseService")
            .field("target", &self.target)
            .field("busy_timeout_ms", &self.busy_timeout_ms)
            .finish()
    }
}

impl DatabaseService {
    /// Open the database described by `config`
    ///
    /// For local targets this will:
    /// 1. Ensure the parent directory exists (create if needed)
    /// 2. Open/create the database file
    /// 3. Switch the journal to WAL mode
    ///
    /// Schema creation is a separate step: call
    /// [`migrations::run`](crate::db::migrations::run) once at startup.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if:
    /// - Parent directory cannot be created
    /// - Database connection fails
    pub async fn open(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let db = match &config.target {
            DatabaseTarget::Local { path } => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        std::fs::create_dir_all(parent).map_err(|e| {
                            if e.kind() == std::io::ErrorKind::PermissionDenied {
                                DatabaseError::permission_denied(path.clone())
                            } else {
                                DatabaseError::DirectoryCreationFailed(e)
                            }
                        })?;
                    }
                }

                Builder::new_local(path)
                    .build()
                    .await
                    .map_err(|e| DatabaseError::connection_failed(config.target.describe(), e))?
            }
            DatabaseTarget::Remote { url, auth_token } => {
                Builder::new_remote(url.clone(), auth_token.clone())
                    .build()
                    .await
                    .map_err(|e| DatabaseError::connection_failed(config.target.describe(), e))?
            }
        };

        let service = Self {
            db: Arc::new(db),
            target: config.target.clone(),
            busy_timeout_ms: config.busy_timeout_ms,
        };

        if service.is_local() {
            let conn = service.connect()?;
            service
                .execute_pragma(&conn, "PRAGMA journal_mode = WAL")
                .await?;
        }

        tracing::debug!("Opened database at {}", service.target.describe());
        Ok(service)
    }

    /// Whether this handle points at an embedded file
    pub fn is_local(&self) -> bool {
        matches!(self.target, DatabaseTarget::Local { .. })
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so we must use query() instead of execute().
    pub(crate) async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Get a raw connection to the database
    ///
    /// **⚠️ WARNING**: the returned connection has no busy timeout and no
    /// foreign key enforcement. Use `connect_with_timeout()` for store work.
    pub fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::LibsqlError)
    }

    /// Get an async connection configured for store operations
    ///
    /// Local connections get the configured busy timeout, so writers queue on
    /// the database lock instead of failing with `SQLITE_BUSY`, and
    /// `foreign_keys = ON`, which item subtree deletion relies on.
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.connect()?;

        if self.is_local() {
            self.execute_pragma(
                &conn,
                &format!("PRAGMA busy_timeout = {}", self.busy_timeout_ms),
            )
            .await?;
            self.execute_pragma(&conn, "PRAGMA foreign_keys = ON")
                .await?;
        }

        Ok(conn)
    }

    /// Begin a write transaction on a fresh connection
    ///
    /// Uses `BEGIN IMMEDIATE`, which takes the database write lock up front:
    /// the revision read that opens every mutation is then serialized against
    /// all other writers.
    pub async fn begin_write(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Transaction, DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        Transaction::begin(conn, TransactionMode::Immediate, cancel.clone()).await
    }

    /// Begin a read transaction for a consistent multi-statement snapshot
    pub async fn begin_read(&self, cancel: &CancellationToken) -> Result<Transaction, DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        Transaction::begin(conn, TransactionMode::Deferred, cancel.clone()).await
    }

    /// Flush the WAL into the main database file (local targets only)
    pub async fn checkpoint(&self) -> Result<(), DatabaseError> {
        if !self.is_local() {
            return Ok(());
        }
        let conn = self.connect_with_timeout().await?;
        self.execute_pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)")
            .await
    }
}
