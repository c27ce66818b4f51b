//! Schema migrations
//!
//! Schema creation is an explicit startup step, never a side effect of a store
//! operation. [`run`] applies every pending migration in version order, each
//! inside its own transaction, and records it in `schema_migrations`.
//! Re-running is a no-op once the database is current.
//!
//! ```no_run
//! # use listkeeper_core::config::DatabaseConfig;
//! # use listkeeper_core::db::{migrations, DatabaseService};
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db = DatabaseService::open(&DatabaseConfig::local("./data/lists.db")).await?;
//! let report = migrations::run(&db).await?;
//! println!("schema at v{}", report.current_version);
//! # Ok(())
//! # }
//! ```

use crate::db::error::DatabaseError;
use crate::db::DatabaseService;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

/// One versioned schema step
#[derive(Debug)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub statements: &'static [&'static str],
}

/// Every migration this build knows about, in ascending version order
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_lists_and_items",
        statements: &[
            "CREATE TABLE IF NOT EXISTS lists (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                is_daily INTEGER NOT NULL DEFAULT 0,
                last_reset_date TEXT,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                deleted_at TEXT,
                revision INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS items (
                id TEXT PRIMARY KEY,
                list_id TEXT NOT NULL,
                name TEXT NOT NULL,
                is_completed INTEGER NOT NULL DEFAULT 0,
                parent_item_id TEXT,
                sort_order INTEGER NOT NULL,
                completed_by_user_id TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                -- List deletion (hard) removes its items
                FOREIGN KEY (list_id) REFERENCES lists(id) ON DELETE CASCADE,
                -- Parent deletion cascades to the whole subtree
                FOREIGN KEY (parent_item_id) REFERENCES items(id) ON DELETE CASCADE
            )",
        ],
    },
    Migration {
        version: 2,
        name: "hierarchy_indexes",
        statements: &[
            "CREATE INDEX IF NOT EXISTS idx_items_list ON items(list_id)",
            "CREATE INDEX IF NOT EXISTS idx_items_parent ON items(parent_item_id)",
            "CREATE INDEX IF NOT EXISTS idx_items_sibling_order ON items(list_id, parent_item_id, sort_order)",
            "CREATE INDEX IF NOT EXISTS idx_lists_user ON lists(user_id, is_deleted)",
        ],
    },
];

/// Highest version in [`MIGRATIONS`]
pub fn latest_version() -> i64 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Outcome of a migration run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub applied: Vec<i64>,
    pub current_version: i64,
}

async fn ensure_bookkeeping(db: &DatabaseService) -> Result<(), DatabaseError> {
    let conn = db.connect_with_timeout().await?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
        (),
    )
    .await
    .map_err(|e| {
        DatabaseError::sql_execution(format!("Failed to create schema_migrations table: {}", e))
    })?;
    Ok(())
}

/// Highest applied migration version (0 for a fresh database)
pub async fn current_version(db: &DatabaseService) -> Result<i64, DatabaseError> {
    let conn = db.connect_with_timeout().await?;

    let mut rows = conn
        .query(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'schema_migrations'",
            (),
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to inspect schema: {}", e)))?;
    let exists: i64 = match rows.next().await? {
        Some(row) => row.get(0)?,
        None => 0,
    };
    if exists == 0 {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_migrations", ())
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to read schema version: {}", e))
        })?;
    match rows.next().await? {
        Some(row) => Ok(row.get(0)?),
        None => Ok(0),
    }
}

/// Apply all pending migrations
pub async fn run(db: &DatabaseService) -> Result<MigrationReport, DatabaseError> {
    ensure_bookkeeping(db).await?;
    let start = current_version(db).await?;
    let mut version = start;
    let mut applied = Vec::new();

    // Migrations are not cancellable: a half-applied step is never useful
    let never = CancellationToken::new();

    for migration in MIGRATIONS.iter().filter(|m| m.version > start) {
        tracing::info!(
            "Applying migration {} ({})",
            migration.version,
            migration.name
        );

        let tx = db.begin_write(&never).await?;
        let result = apply_one(&tx, migration).await;
        tx.finish(result).await?;

        version = migration.version;
        applied.push(migration.version);
    }

    if applied.is_empty() {
        tracing::debug!("Schema already at version {}", version);
    }

    Ok(MigrationReport {
        applied,
        current_version: version,
    })
}

async fn apply_one(
    tx: &crate::db::Transaction,
    migration: &Migration,
) -> Result<(), DatabaseError> {
    for statement in migration.statements {
        tx.execute(statement, (), "apply migration statement")
            .await
            .map_err(|e| {
                DatabaseError::migration_failed(migration.version, migration.name, e.to_string())
            })?;
    }

    tx.execute(
        "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)",
        (migration.version, migration.name, Utc::now().to_rfc3339()),
        "record migration",
    )
    .await?;
    Ok(())
}

/// Fail unless every known migration has been applied
pub async fn ensure_current(db: &DatabaseService) -> Result<(), DatabaseError> {
    let found = current_version(db).await?;
    let expected = latest_version();
    if found < expected {
        return Err(DatabaseError::SchemaOutdated { found, expected });
    }
    Ok(())
}
