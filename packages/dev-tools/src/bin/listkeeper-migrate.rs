//! Schema migration runner
//!
//! Brings a listkeeper database up to the latest schema version. The store
//! itself never creates tables; run this once per database before starting
//! anything that opens a `ListStore`.
//!
//! # Usage
//!
//! ```bash
//! # Local file from the environment
//! LISTKEEPER_DB_PATH=./lists.db cargo run --bin listkeeper-migrate
//!
//! # Or a JSON config file
//! cargo run --bin listkeeper-migrate -- ./listkeeper.json
//! ```
//!
//! Logging honours `RUST_LOG`, defaulting to `info`.

use anyhow::Context;
use listkeeper_core::config::StoreConfig;
use listkeeper_core::db::{migrations, DatabaseService};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => StoreConfig::from_json_file(&PathBuf::from(path))?,
        None => StoreConfig::from_env().context("no config file given and environment incomplete")?,
    };

    println!("Migrating {}", config.database.target.describe());
    let db = DatabaseService::open(&config.database)
        .await
        .context("failed to open database")?;

    let before = migrations::current_version(&db).await?;
    let report = migrations::run(&db).await?;
    tracing::info!(applied = ?report.applied, "Migration run finished");

    if report.applied.is_empty() {
        println!("Schema already at version {}", report.current_version);
    } else {
        println!(
            "Applied {} migration(s): version {} -> {}",
            report.applied.len(),
            before,
            report.current_version
        );
    }

    db.checkpoint().await?;
    Ok(())
}
