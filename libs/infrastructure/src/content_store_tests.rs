//! # Content Store Tests
//!
//! `SqliteContentStore` の種別ごとのルックアップとバッチ読みのテストスイート。

#[cfg(test)]
mod tests {
    use crate::content_store::SqliteContentStore;
    use chipper_core::traits::ContentStore;

    async fn create_test_store() -> (SqliteContentStore, tempfile::TempDir) {
        let tmp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let db_path = tmp_dir.path().join("test.db");
        let db_path_str = db_path.to_str().expect("Invalid path");
        let store = SqliteContentStore::new(db_path_str)
            .await
            .expect("Failed to create test store");
        (store, tmp_dir)
    }

    // ===== 1. Users =====

    #[tokio::test]
    async fn test_create_and_fetch_user() {
        let (store, _tmp) = create_test_store().await;

        let created = store.create_user("Ada", "ada@example.com").await.unwrap();
        let fetched = store.fetch_user(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Ada");
        assert_eq!(fetched.email, "ada@example.com");
    }

    #[tokio::test]
    async fn test_fetch_missing_user_is_none() {
        let (store, _tmp) = create_test_store().await;
        assert!(store.fetch_user("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_user_if_absent() {
        let (store, _tmp) = create_test_store().await;

        let created = store.insert_user_if_absent("Ada", "ada@example.com").await.unwrap();
        assert!(created);

        // Same email again: skipped, and the first name survives
        let created_again = store
            .insert_user_if_absent("Someone Else", "ada@example.com")
            .await
            .unwrap();
        assert!(!created_again);

        let users = store.fetch_users(&[]).await.unwrap();
        assert!(users.is_empty()); // empty id list short-circuits

        let all = sqlx::query_as::<_, (String,)>("SELECT name FROM users")
            .fetch_all(store.pool_ref())
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].0, "Ada");
    }

    #[tokio::test]
    async fn test_batch_fetch_users_skips_missing() {
        let (store, _tmp) = create_test_store().await;

        let ada = store.create_user("Ada", "ada@example.com").await.unwrap();
        let grace = store.create_user("Grace", "grace@example.com").await.unwrap();

        let ids = vec![ada.id.clone(), "ghost".to_string(), grace.id.clone()];
        let users = store.fetch_users(&ids).await.unwrap();

        assert_eq!(users.len(), 2);
        assert!(users.iter().any(|u| u.id == ada.id));
        assert!(users.iter().any(|u| u.id == grace.id));
    }

    // ===== 2. Posts =====

    #[tokio::test]
    async fn test_create_and_fetch_post() {
        let (store, _tmp) = create_test_store().await;

        let author = store.create_user("Grace", "grace@example.com").await.unwrap();
        let post = store
            .create_post(&author.id, "On Compilers", "Body text")
            .await
            .unwrap();

        let fetched = store.fetch_post(&post.id).await.unwrap().unwrap();
        assert_eq!(fetched.user_id, author.id);
        assert_eq!(fetched.title, "On Compilers");
        assert_eq!(fetched.body, "Body text");
    }

    #[tokio::test]
    async fn test_batch_fetch_posts_skips_missing() {
        let (store, _tmp) = create_test_store().await;

        let author = store.create_user("Grace", "grace@example.com").await.unwrap();
        let p1 = store.create_post(&author.id, "First", "a").await.unwrap();
        let p2 = store.create_post(&author.id, "Second", "b").await.unwrap();

        let ids = vec![p1.id.clone(), "ghost".to_string(), p2.id.clone()];
        let posts = store.fetch_posts(&ids).await.unwrap();
        assert_eq!(posts.len(), 2);
    }
}
