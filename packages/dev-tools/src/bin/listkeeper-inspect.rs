//! List inspection tool
//!
//! Prints store contents as JSON for debugging. Reads the database location
//! from the environment (`LISTKEEPER_DB_PATH`, or `LISTKEEPER_DB_URL` with
//! `LISTKEEPER_DB_AUTH_TOKEN`).
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin listkeeper-inspect -- lists <user-id>
//! cargo run --bin listkeeper-inspect -- show <list-id>
//! cargo run --bin listkeeper-inspect -- reset [YYYY-MM-DD]
//! ```
//!
//! `reset` runs the daily reset for every due list (today, in UTC, unless a
//! date is given). Ctrl-C cancels the operation in flight.

use anyhow::{anyhow, bail, Context};
use chrono::{NaiveDate, Utc};
use listkeeper_core::{CancellationToken, ListStore, StoreConfig};
use serde_json::json;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: listkeeper-inspect <lists USER | show LIST | reset [DATE]>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,listkeeper_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).ok_or_else(|| anyhow!(USAGE))?;

    let config = StoreConfig::from_env()?;
    let db = Arc::new(
        listkeeper_core::DatabaseService::open(&config.database)
            .await
            .context("failed to open database")?,
    );
    let store = ListStore::new(db, &config)
        .await
        .context("database is not migrated; run listkeeper-migrate first")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let output = match command {
        "lists" => {
            let user_id = args.get(1).ok_or_else(|| anyhow!(USAGE))?;
            let lists = store.lists_for_user(user_id, &cancel).await?;
            serde_json::to_value(lists)?
        }
        "show" => {
            let list_id = args.get(1).ok_or_else(|| anyhow!(USAGE))?;
            let list = store.get_list(list_id, &cancel).await?;
            let items = store.get_items(list_id, &cancel).await?;
            json!({ "list": list, "items": items })
        }
        "reset" => {
            let today = match args.get(1) {
                Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .with_context(|| format!("invalid date '{}'", raw))?,
                None => Utc::now().date_naive(),
            };
            let resets = store.run_daily_resets(today, &cancel).await?;
            serde_json::to_value(resets)?
        }
        other => bail!("unknown command '{}'\n{}", other, USAGE),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
