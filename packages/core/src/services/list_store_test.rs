//! Tests for list lifecycle operations
//!
//! Tests cover:
//! - Creation, lookup and per-user listing
//! - Gated list metadata updates
//! - Soft delete and restore
//! - Daily reset scheduling

#[cfg(test)]
mod tests {
    use crate::config::StoreConfig;
    use crate::db::ListEvent;
    use crate::services::test_support::create_test_store;
    use crate::services::{ListStore, ListStoreError};
    use chrono::NaiveDate;
    use tokio_util::sync::CancellationToken;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[tokio::test]
    async fn test_create_list_starts_at_revision_zero() {
        let (store, _temp) = create_test_store().await;
        let cancel = CancellationToken::new();

        let list = store
            .create_list("user-1", "  Groceries ", false, &cancel)
            .await
            .unwrap();

        assert_eq!(list.revision, 0);
        assert_eq!(list.name, "Groceries");
        assert!(!list.is_deleted);
        assert_eq!(store.get_list_revision(&list.id, &cancel).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_list_rejects_blank_name_and_user() {
        let (store, _temp) = create_test_store().await;
        let cancel = CancellationToken::new();

        let err = store.create_list("user-1", "   ", false, &cancel).await.unwrap_err();
        assert!(matches!(err, ListStoreError::Validation(_)));

        let err = store.create_list("", "Chores", false, &cancel).await.unwrap_err();
        assert!(matches!(err, ListStoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_lists_for_user_excludes_others_and_deleted() {
        let (store, _temp) = create_test_store().await;
        let cancel = CancellationToken::new();

        let a = store.create_list("alice", "A", false, &cancel).await.unwrap();
        let b = store.create_list("alice", "B", false, &cancel).await.unwrap();
        store.create_list("bob", "C", false, &cancel).await.unwrap();
        store.soft_delete_list(&b.id, b.revision, &cancel).await.unwrap();

        let lists = store.lists_for_user("alice", &cancel).await.unwrap();
        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].id, a.id);
    }

    #[tokio::test]
    async fn test_rename_list_is_gated() {
        let (store, _temp) = create_test_store().await;
        let cancel = CancellationToken::new();
        let list = store.create_list("u", "Old", false, &cancel).await.unwrap();

        let outcome = store.rename_list(&list.id, "New", 0, &cancel).await.unwrap();
        assert_eq!(outcome.new_revision, 1);

        let err = store
            .rename_list(&list.id, "Newer", 0, &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.current_revision(), Some(1));

        let list = store.get_list(&list.id, &cancel).await.unwrap();
        assert_eq!(list.name, "New");
    }

    #[tokio::test]
    async fn test_soft_deleted_list_hides_items_until_restored() {
        let (store, _temp) = create_test_store().await;
        let cancel = CancellationToken::new();
        let list = store.create_list("u", "Trip", false, &cancel).await.unwrap();
        let item = store.add_item(&list.id, "Passport", &cancel).await.unwrap();

        let deleted = store
            .soft_delete_list(&list.id, item.new_revision, &cancel)
            .await
            .unwrap();

        assert!(matches!(
            store.get_items(&list.id, &cancel).await,
            Err(ListStoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.add_item(&list.id, "Tickets", &cancel).await,
            Err(ListStoreError::NotFound { .. })
        ));
        assert!(matches!(
            store
                .rename_item(&item.item_id, "Visa", deleted.new_revision, &cancel)
                .await,
            Err(ListStoreError::NotFound { .. })
        ));

        let restored = store.restore_list(&list.id, &cancel).await.unwrap();
        assert_eq!(restored.new_revision, deleted.new_revision + 1);
        assert_eq!(store.get_items(&list.id, &cancel).await.unwrap().len(), 1);

        // Already restored: no bump
        let again = store.restore_list(&list.id, &cancel).await.unwrap();
        assert_eq!(again.new_revision, restored.new_revision);
    }

    #[tokio::test]
    async fn test_daily_reset_runs_once_per_day() {
        let (store, _temp) = create_test_store().await;
        let cancel = CancellationToken::new();
        let daily = store.create_list("u", "Habits", true, &cancel).await.unwrap();
        let plain = store.create_list("u", "Errands", false, &cancel).await.unwrap();

        for list_id in [&daily.id, &plain.id] {
            let item = store.add_item(list_id, "Stretch", &cancel).await.unwrap();
            store
                .set_item_completed_by_user(&item.item_id, "u", true, &cancel)
                .await
                .unwrap();
        }
        let before = store.get_list_revision(&daily.id, &cancel).await.unwrap();

        let resets = store.run_daily_resets(day(10), &cancel).await.unwrap();
        assert_eq!(resets.len(), 1);
        assert_eq!(resets[0].list_id, daily.id);
        assert_eq!(resets[0].items_reset, 1);
        assert_eq!(resets[0].new_revision, before + 1);

        let items = store.get_items(&daily.id, &cancel).await.unwrap();
        assert!(!items[0].item.is_completed);
        assert!(items[0].item.completed_by_user_id.is_none());

        // Untouched non-daily list
        let items = store.get_items(&plain.id, &cancel).await.unwrap();
        assert!(items[0].item.is_completed);

        // Same day again: nothing due
        assert!(store.run_daily_resets(day(10), &cancel).await.unwrap().is_empty());

        // Next day: due again even with nothing completed
        let resets = store.run_daily_resets(day(11), &cancel).await.unwrap();
        assert_eq!(resets.len(), 1);
        assert_eq!(resets[0].items_reset, 0);

        let list = store.get_list(&daily.id, &cancel).await.unwrap();
        assert_eq!(list.last_reset_date, Some(day(11)));
    }

    #[tokio::test]
    async fn test_daily_reset_pass_skips_list_deleted_mid_pass() {
        let (store, _temp) = create_test_store().await;
        let cancel = CancellationToken::new();
        let first = store.create_list("u", "First", true, &cancel).await.unwrap();
        let victim = store.create_list("u", "Victim", true, &cancel).await.unwrap();
        let last = store.create_list("u", "Last", true, &cancel).await.unwrap();

        // Pin the pass order, then soft-delete the middle list as soon as
        // the first one is reset
        let conn = store.database().connect().unwrap();
        for (id, created_at) in [
            (&first.id, "2025-01-01T00:00:00+00:00"),
            (&victim.id, "2025-01-02T00:00:00+00:00"),
            (&last.id, "2025-01-03T00:00:00+00:00"),
        ] {
            conn.execute(
                "UPDATE lists SET created_at = ? WHERE id = ?",
                (created_at, id.as_str()),
            )
            .await
            .unwrap();
        }
        conn.execute(
            &format!(
                "CREATE TRIGGER hide_victim AFTER UPDATE OF last_reset_date ON lists
                 WHEN NEW.id = '{}'
                 BEGIN UPDATE lists SET is_deleted = 1 WHERE id = '{}'; END",
                first.id, victim.id
            ),
            (),
        )
        .await
        .unwrap();

        let resets = store.run_daily_resets(day(10), &cancel).await.unwrap();
        let reset_ids: Vec<&str> = resets.iter().map(|r| r.list_id.as_str()).collect();
        assert_eq!(reset_ids, vec![first.id.as_str(), last.id.as_str()]);
    }

    #[tokio::test]
    async fn test_events_follow_commits() {
        let (store, _temp) = create_test_store().await;
        let cancel = CancellationToken::new();
        let mut rx = store.subscribe_to_events();

        let list = store.create_list("u", "Events", false, &cancel).await.unwrap();
        let _ = store.rename_list(&list.id, "Stale", 7, &cancel).await;
        store.rename_list(&list.id, "Fresh", 0, &cancel).await.unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            ListEvent::ListCreated {
                list_id: list.id.clone(),
                revision: 0
            }
        );
        // The rejected rename emits nothing
        assert_eq!(
            rx.recv().await.unwrap(),
            ListEvent::ListChanged {
                list_id: list.id.clone(),
                revision: 1
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_store_rejects_invalid_config() {
        let (store, temp) = create_test_store().await;
        let mut config = StoreConfig::local(temp.path().join("test.db"));
        config.limits.max_depth = 0;

        let err = ListStore::new(store.database().clone(), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, ListStoreError::Config(_)));
    }

    #[tokio::test]
    async fn test_unknown_list_is_not_found() {
        let (store, _temp) = create_test_store().await;
        let cancel = CancellationToken::new();

        assert!(matches!(
            store.get_list_revision("missing", &cancel).await,
            Err(ListStoreError::NotFound { .. })
        ));
    }
}
