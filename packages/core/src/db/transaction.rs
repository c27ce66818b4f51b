//! Cancellable transactions
//!
//! A [`Transaction`] owns one connection with an open `BEGIN`. Every statement
//! is raced against the caller's
//! [`CancellationToken`](tokio_util::sync::CancellationToken); a cancelled
//! statement surfaces as [`DatabaseError::Cancelled`] and the caller rolls
//! back. Dropping a transaction without committing drops its connection,
//! which discards the uncommitted work.

use crate::db::error::DatabaseError;
use libsql::params::IntoParams;
use libsql::{Connection, Row};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// How the transaction acquires the database lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    /// Lock taken on first write (read snapshots)
    Deferred,
    /// Write lock taken immediately (mutations)
    Immediate,
}

impl TransactionMode {
    fn begin_statement(self) -> &'static str {
        match self {
            Self::Deferred => "BEGIN DEFERRED",
            Self::Immediate => "BEGIN IMMEDIATE",
        }
    }
}

/// An open transaction on a dedicated connection
pub struct Transaction {
    conn: Connection,
    cancel: CancellationToken,
}

impl Transaction {
    pub(crate) async fn begin(
        conn: Connection,
        mode: TransactionMode,
        cancel: CancellationToken,
    ) -> Result<Self, DatabaseError> {
        let tx = Self { conn, cancel };
        tx.guard(
            tx.conn.execute(mode.begin_statement(), ()),
            "begin transaction",
        )
        .await?;
        Ok(tx)
    }

    async fn guard<T>(
        &self,
        fut: impl Future<Output = Result<T, libsql::Error>>,
        context: &str,
    ) -> Result<T, DatabaseError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DatabaseError::Cancelled),
            result = fut => result.map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to {}: {}", context, e))
            }),
        }
    }

    /// Execute a statement, returning the number of rows changed
    pub async fn execute(
        &self,
        sql: &str,
        params: impl IntoParams,
        context: &str,
    ) -> Result<u64, DatabaseError> {
        self.guard(self.conn.execute(sql, params), context).await
    }

    /// Run a query and decode every row with `decode`
    ///
    /// Each row is decoded while the cursor still points at it; libsql rows
    /// read their values lazily from the statement, so a row kept past the
    /// next step reads as NULL.
    pub async fn query_map<T, E>(
        &self,
        sql: &str,
        params: impl IntoParams,
        context: &str,
        mut decode: impl FnMut(&Row) -> Result<T, E>,
    ) -> Result<Vec<T>, E>
    where
        E: From<DatabaseError>,
    {
        let mut rows = self.guard(self.conn.query(sql, params), context).await?;
        let mut decoded = Vec::new();
        while let Some(row) = self.guard(rows.next(), context).await? {
            decoded.push(decode(&row)?);
        }
        Ok(decoded)
    }

    /// Run a query and return its first row, if any
    pub async fn query_opt(
        &self,
        sql: &str,
        params: impl IntoParams,
        context: &str,
    ) -> Result<Option<Row>, DatabaseError> {
        let mut rows = self.guard(self.conn.query(sql, params), context).await?;
        self.guard(rows.next(), context).await
    }

    /// Commit the transaction
    ///
    /// Cancellation is checked once before `COMMIT`; the commit itself is
    /// never interrupted.
    pub async fn commit(self) -> Result<(), DatabaseError> {
        if self.cancel.is_cancelled() {
            self.rollback().await;
            return Err(DatabaseError::Cancelled);
        }

        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            self.rollback().await;
            return Err(DatabaseError::sql_execution(format!(
                "Failed to commit transaction: {}",
                e
            )));
        }
        Ok(())
    }

    /// Roll the transaction back
    ///
    /// Failures are logged, not returned: the connection is dropped right
    /// after, which discards any uncommitted work anyway.
    pub async fn rollback(self) {
        if let Err(e) = self.conn.execute("ROLLBACK", ()).await {
            tracing::warn!("Rollback failed (connection discarded): {}", e);
        }
    }

    /// Commit on `Ok`, roll back on `Err`, and pass the result through
    pub async fn finish<T, E>(self, result: Result<T, E>) -> Result<T, E>
    where
        E: From<DatabaseError>,
    {
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(e) => {
                self.rollback().await;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::DatabaseService;
    use tempfile::TempDir;

    async fn scratch_db() -> (DatabaseService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = DatabaseService::open(&DatabaseConfig::local(temp_dir.path().join("tx.db")))
            .await
            .unwrap();
        let conn = db.connect().unwrap();
        conn.execute("CREATE TABLE kv (k TEXT PRIMARY KEY, v INTEGER NOT NULL)", ())
            .await
            .unwrap();
        (db, temp_dir)
    }

    async fn count(db: &DatabaseService) -> i64 {
        let conn = db.connect().unwrap();
        let mut rows = conn.query("SELECT COUNT(*) FROM kv", ()).await.unwrap();
        rows.next().await.unwrap().unwrap().get(0).unwrap()
    }

    #[tokio::test]
    async fn test_commit_persists() {
        let (db, _temp) = scratch_db().await;
        let cancel = CancellationToken::new();

        let tx = db.begin_write(&cancel).await.unwrap();
        tx.execute("INSERT INTO kv VALUES (?, ?)", ("a", 1), "insert")
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_finish_rolls_back_on_error() {
        let (db, _temp) = scratch_db().await;
        let cancel = CancellationToken::new();

        let tx = db.begin_write(&cancel).await.unwrap();
        tx.execute("INSERT INTO kv VALUES (?, ?)", ("a", 1), "insert")
            .await
            .unwrap();
        let result: Result<(), DatabaseError> = tx
            .finish(Err(DatabaseError::sql_execution("rejected")))
            .await;

        assert!(result.is_err());
        assert_eq!(count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_cancelled_token_rejects_statements() {
        let (db, _temp) = scratch_db().await;
        let cancel = CancellationToken::new();

        let tx = db.begin_write(&cancel).await.unwrap();
        cancel.cancel();
        let err = tx
            .execute("INSERT INTO kv VALUES (?, ?)", ("a", 1), "insert")
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Cancelled));
        tx.rollback().await;

        assert_eq!(count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_commit_after_cancel_rolls_back() {
        let (db, _temp) = scratch_db().await;
        let cancel = CancellationToken::new();

        let tx = db.begin_write(&cancel).await.unwrap();
        tx.execute("INSERT INTO kv VALUES (?, ?)", ("a", 1), "insert")
            .await
            .unwrap();
        cancel.cancel();

        assert!(matches!(tx.commit().await, Err(DatabaseError::Cancelled)));
        assert_eq!(count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_query_map_decodes_every_row() {
        let (db, _temp) = scratch_db().await;
        let cancel = CancellationToken::new();

        let tx = db.begin_write(&cancel).await.unwrap();
        tx.execute(
            "INSERT INTO kv VALUES (?, ?), (?, ?), (?, ?)",
            ("a", 1, "b", 2, "c", 3),
            "insert",
        )
        .await
        .unwrap();

        let rows: Vec<(String, i64)> = tx
            .query_map("SELECT k, v FROM kv ORDER BY k", (), "select", |row| {
                Ok::<_, DatabaseError>((row.get(0)?, row.get(1)?))
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(
            rows,
            vec![
                ("a".to_string(), 1),
                ("b".to_string(), 2),
                ("c".to_string(), 3)
            ]
        );
    }

    #[tokio::test]
    async fn test_query_map_stops_at_decode_error() {
        let (db, _temp) = scratch_db().await;
        let cancel = CancellationToken::new();

        let tx = db.begin_write(&cancel).await.unwrap();
        tx.execute("INSERT INTO kv VALUES (?, ?), (?, ?)", ("a", 1, "b", 2), "insert")
            .await
            .unwrap();

        let result: Result<Vec<i64>, DatabaseError> = tx
            .query_map("SELECT v FROM kv ORDER BY k", (), "select", |row| {
                let v: i64 = row.get(0)?;
                if v == 2 {
                    return Err(DatabaseError::sql_execution("bad row"));
                }
                Ok(v)
            })
            .await;
        assert!(result.is_err());
        tx.rollback().await;
    }

    #[tokio::test]
    async fn test_query_opt_returns_first_row() {
        let (db, _temp) = scratch_db().await;
        let cancel = CancellationToken::new();

        let tx = db.begin_write(&cancel).await.unwrap();
        tx.execute("INSERT INTO kv VALUES (?, ?), (?, ?)", ("a", 1, "b", 2), "insert")
            .await
            .unwrap();
        let row = tx
            .query_opt("SELECT v FROM kv ORDER BY k DESC", (), "select")
            .await
            .unwrap()
            .unwrap();
        let v: i64 = row.get(0).unwrap();
        assert_eq!(v, 2);

        let missing = tx
            .query_opt("SELECT v FROM kv WHERE k = ?", ["zzz"], "select")
            .await
            .unwrap();
        assert!(missing.is_none());
        tx.commit().await.unwrap();
    }
}
