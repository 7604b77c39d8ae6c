//! # Favorite Ledger Tests
//!
//! ファイルベース一時 SQLite を使った `SqliteFavoriteLedger` のテストスイート。
//! 三つ組の一意性と並び順という台帳の不変条件を機械的に保証する。

#[cfg(test)]
mod tests {
    use crate::favorite_ledger::SqliteFavoriteLedger;
    use chipper_core::error::ChipperError;
    use chipper_core::traits::{FavoriteLedger, TargetKind};

    /// テスト用のユニーク一時ファイル台帳を作成
    /// 各テストが独自のDBファイルを持ち、ロック競合を回避する
    async fn create_test_ledger() -> (SqliteFavoriteLedger, tempfile::TempDir) {
        let tmp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let db_path = tmp_dir.path().join("test.db");
        let db_path_str = db_path.to_str().expect("Invalid path");
        let ledger = SqliteFavoriteLedger::new(db_path_str)
            .await
            .expect("Failed to create test ledger");
        (ledger, tmp_dir) // tmp_dir must be kept alive for the DB file to exist
    }

    // ===== 1. Basic round trip =====

    #[tokio::test]
    async fn test_insert_and_exists() {
        let (ledger, _tmp) = create_test_ledger().await;

        assert!(!ledger.exists("actor-a", TargetKind::Post, "post-1").await.unwrap());

        let favorite = ledger
            .insert("actor-a", TargetKind::Post, "post-1")
            .await
            .unwrap();
        assert!(!favorite.id.is_empty());
        assert_eq!(favorite.user_id, "actor-a");
        assert_eq!(favorite.target_kind, TargetKind::Post);
        assert_eq!(favorite.target_id, "post-1");

        assert!(ledger.exists("actor-a", TargetKind::Post, "post-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_returns_whether_deleted() {
        let (ledger, _tmp) = create_test_ledger().await;

        ledger
            .insert("actor-a", TargetKind::User, "user-b")
            .await
            .unwrap();

        assert!(ledger.remove("actor-a", TargetKind::User, "user-b").await.unwrap());
        assert!(!ledger.exists("actor-a", TargetKind::User, "user-b").await.unwrap());

        // Removing a favorite that is already gone is not an error
        assert!(!ledger.remove("actor-a", TargetKind::User, "user-b").await.unwrap());
    }

    // ===== 2. Uniqueness =====

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let (ledger, _tmp) = create_test_ledger().await;

        ledger
            .insert("actor-a", TargetKind::Post, "post-1")
            .await
            .unwrap();

        let second = ledger.insert("actor-a", TargetKind::Post, "post-1").await;
        assert!(matches!(
            second,
            Err(ChipperError::AlreadyFavorited { .. })
        ));

        let favorites = ledger.list_by_actor("actor-a").await.unwrap();
        assert_eq!(favorites.len(), 1);
    }

    #[tokio::test]
    async fn test_same_target_id_different_kind_is_distinct() {
        let (ledger, _tmp) = create_test_ledger().await;

        // A post and a user that happen to share an id are different targets
        ledger.insert("actor-a", TargetKind::Post, "42").await.unwrap();
        ledger.insert("actor-a", TargetKind::User, "42").await.unwrap();

        let favorites = ledger.list_by_actor("actor-a").await.unwrap();
        assert_eq!(favorites.len(), 2);
    }

    // ===== 3. Concurrent insert =====

    #[tokio::test]
    async fn test_concurrent_insert_single_winner() {
        let (ledger, _tmp) = create_test_ledger().await;
        let ledger = std::sync::Arc::new(ledger);

        // Two concurrent inserts of the same triple; the UNIQUE index arbitrates
        let l1 = ledger.clone();
        let l2 = ledger.clone();

        let (r1, r2) = tokio::join!(
            tokio::spawn(async move { l1.insert("actor-a", TargetKind::User, "user-b").await }),
            tokio::spawn(async move { l2.insert("actor-a", TargetKind::User, "user-b").await }),
        );

        let results = [r1.unwrap(), r2.unwrap()];
        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1, "Exactly one concurrent insert should win");

        for result in &results {
            if let Err(e) = result {
                assert!(matches!(e, ChipperError::AlreadyFavorited { .. }));
            }
        }

        // The ledger ends with exactly one row for the triple
        let favorites = ledger.list_by_actor("actor-a").await.unwrap();
        assert_eq!(favorites.len(), 1);
    }

    // ===== 4. Listing order =====

    #[tokio::test]
    async fn test_list_by_actor_creation_order() {
        let (ledger, _tmp) = create_test_ledger().await;

        ledger.insert("actor-a", TargetKind::Post, "post-1").await.unwrap();
        ledger.insert("actor-a", TargetKind::User, "user-b").await.unwrap();
        ledger.insert("actor-a", TargetKind::Post, "post-2").await.unwrap();
        // 別アクターの行は混ざらない
        ledger.insert("actor-z", TargetKind::Post, "post-1").await.unwrap();

        let favorites = ledger.list_by_actor("actor-a").await.unwrap();
        let targets: Vec<&str> = favorites.iter().map(|f| f.target_id.as_str()).collect();
        assert_eq!(targets, vec!["post-1", "user-b", "post-2"]);
    }

    // ===== 5. Follower resolution =====

    #[tokio::test]
    async fn test_list_followers_filters_by_kind() {
        let (ledger, _tmp) = create_test_ledger().await;

        ledger.insert("actor-a", TargetKind::User, "author-b").await.unwrap();
        ledger.insert("actor-c", TargetKind::User, "author-b").await.unwrap();
        // kind=Post のお気に入りは、target_id が同じでもフォローではない
        ledger.insert("actor-d", TargetKind::Post, "author-b").await.unwrap();
        // 別ユーザーへのフォローも混ざらない
        ledger.insert("actor-e", TargetKind::User, "author-x").await.unwrap();

        let followers = ledger.list_followers_of_user("author-b").await.unwrap();
        assert_eq!(followers, vec!["actor-a".to_string(), "actor-c".to_string()]);
    }

    #[tokio::test]
    async fn test_list_followers_empty_without_favorites() {
        let (ledger, _tmp) = create_test_ledger().await;
        let followers = ledger.list_followers_of_user("nobody").await.unwrap();
        assert!(followers.is_empty());
    }
}
