//! Revision Gate Tests
//!
//! Concurrent callers racing on the same observed revision: exactly one
//! mutation may commit, every other one must fail with `RevisionMismatch`
//! and leave no trace.

#[cfg(test)]
mod revision_gate_tests {
    use anyhow::Result;
    use listkeeper_core::config::StoreConfig;
    use listkeeper_core::db::{migrations, DatabaseService};
    use listkeeper_core::{CancellationToken, ListStore, ListStoreError};
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn create_test_store() -> Result<(ListStore, TempDir)> {
        let temp_dir = TempDir::new()?;
        let config = StoreConfig::local(temp_dir.path().join("gate.db"));
        let db = Arc::new(DatabaseService::open(&config.database).await?);
        migrations::run(&db).await?;
        let store = ListStore::new(db, &config).await?;
        Ok((store, temp_dir))
    }

    #[tokio::test]
    async fn test_store_refuses_unmigrated_database() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config = StoreConfig::local(temp_dir.path().join("raw.db"));
        let db = Arc::new(DatabaseService::open(&config.database).await?);

        let err = ListStore::new(db, &config).await.unwrap_err();
        assert!(matches!(err, ListStoreError::Database(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_revision_strictly_increases() -> Result<()> {
        let (store, _temp) = create_test_store().await?;
        let cancel = CancellationToken::new();
        let list = store.create_list("u", "Mono", false, &cancel).await?;

        let mut seen = vec![list.revision];
        let a = store.add_item(&list.id, "A", &cancel).await?;
        seen.push(a.new_revision);
        let r = store.rename_item(&a.item_id, "A2", a.new_revision, &cancel).await?;
        seen.push(r.new_revision);
        let b = store.add_item(&list.id, "B", &cancel).await?;
        seen.push(b.new_revision);
        let o = store.set_item_order(&b.item_id, 10, b.new_revision, &cancel).await?;
        seen.push(o.new_revision);

        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert_eq!(store.get_list_revision(&list.id, &cancel).await?, 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_previous_revision_fails_current_succeeds() -> Result<()> {
        let (store, _temp) = create_test_store().await?;
        let cancel = CancellationToken::new();
        let list = store.create_list("u", "Lock", false, &cancel).await?;
        let item = store.add_item(&list.id, "Item", &cancel).await?;
        let current = item.new_revision;

        let err = store
            .rename_item(&item.item_id, "Stale", current - 1, &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.current_revision(), Some(current));

        tokio_test::assert_ok!(
            store
                .rename_item(&item.item_id, "Fresh", current, &cancel)
                .await
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_writers_only_one_wins() -> Result<()> {
        let (store, _temp) = create_test_store().await?;
        let cancel = CancellationToken::new();
        let list = store.create_list("u", "Race", false, &cancel).await?;
        let item = store.add_item(&list.id, "Contended", &cancel).await?;
        let observed = item.new_revision;

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            let item_id = item.item_id.clone();
            handles.push(tokio::spawn(async move {
                let cancel = CancellationToken::new();
                store
                    .rename_item(&item_id, &format!("Writer {}", i), observed, &cancel)
                    .await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            match handle.await? {
                Ok(outcome) => {
                    assert_eq!(outcome.new_revision, observed + 1);
                    winners += 1;
                }
                Err(ListStoreError::RevisionMismatch { current, .. }) => {
                    assert_eq!(current, observed + 1);
                }
                Err(other) => panic!("unexpected error: {}", other),
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(store.get_list_revision(&list.id, &cancel).await?, observed + 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_different_lists_do_not_interfere() -> Result<()> {
        let (store, _temp) = create_test_store().await?;
        let cancel = CancellationToken::new();
        let one = store.create_list("u", "One", false, &cancel).await?;
        let two = store.create_list("u", "Two", false, &cancel).await?;

        store.rename_list(&one.id, "One again", 0, &cancel).await?;
        // Revision 0 is still current for the other list
        store.rename_list(&two.id, "Two again", 0, &cancel).await?;

        assert_eq!(store.get_list_revision(&one.id, &cancel).await?, 1);
        assert_eq!(store.get_list_revision(&two.id, &cancel).await?, 1);
        Ok(())
    }
}
