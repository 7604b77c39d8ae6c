//! # The Contract — コンポーネント間通信契約
//!
//! HTTPエッジ・サービス・キュー・ディスパッチャ間のやり取りを型安全に定義する。
//! ここにはデータのみを置き、ロジックは持たせない（要約の切り詰めのみ例外）。

use serde::{Deserialize, Serialize};

/// 通知に載せる投稿本文の最大文字数
pub const SUMMARY_MAX_CHARS: usize = 160;

// --- Publication クラスター ---

/// 投稿公開イベント
///
/// 投稿がストレージにコミットされた後、1投稿につき一度だけ発行される。
/// 可変なドメインオブジェクトへの参照ではなく、IDと表示用文字列のみを運ぶ。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicationEvent {
    pub author_id: String,
    pub post_id: String,
    pub post_title: String,
    pub post_summary: String,
}

/// フォロワー1人分の通知ペイロード
///
/// 各送信は自分専用の不変ペイロードを持ち、送信間で状態を共有しない。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub follower_id: String,
    pub follower_name: String,
    pub follower_email: String,
    pub author_name: String,
    pub post_id: String,
    pub post_title: String,
    /// `SUMMARY_MAX_CHARS` 文字に切り詰め済み
    pub post_summary: String,
}

/// 本文を `SUMMARY_MAX_CHARS` 文字に切り詰める。
/// 切り詰めが起きた場合のみ末尾に "..." を付ける
pub fn truncate_summary(body: &str) -> String {
    if body.chars().count() <= SUMMARY_MAX_CHARS {
        return body.to_string();
    }
    let cut: String = body.chars().take(SUMMARY_MAX_CHARS).collect();
    format!("{}...", cut.trim_end())
}

// --- Favorites クラスター ---

/// お気に入り投稿の表示用エントリ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoritedPost {
    pub post_id: String,
    pub title: String,
    pub favorited_at: String,
}

/// お気に入りユーザーの表示用エントリ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoritedUser {
    pub user_id: String,
    pub name: String,
    pub favorited_at: String,
}

/// お気に入り一覧（種別ごとに分割済み、作成日時昇順）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FavoritesList {
    pub posts: Vec<FavoritedPost>,
    pub users: Vec<FavoritedUser>,
}

// --- Post クラスター ---

/// 投稿作成リクエスト
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_summary_untouched() {
        assert_eq!(truncate_summary("short body"), "short body");
    }

    #[test]
    fn test_exact_length_untouched() {
        let body: String = "x".repeat(SUMMARY_MAX_CHARS);
        assert_eq!(truncate_summary(&body), body);
    }

    #[test]
    fn test_long_summary_truncated_with_ellipsis() {
        let body: String = "y".repeat(SUMMARY_MAX_CHARS + 40);
        let summary = truncate_summary(&body);
        assert_eq!(summary.chars().count(), SUMMARY_MAX_CHARS + 3);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        // マルチバイト文字の途中で切らないこと
        let body: String = "通".repeat(SUMMARY_MAX_CHARS + 1);
        let summary = truncate_summary(&body);
        assert!(summary.starts_with('通'));
        assert!(summary.ends_with("..."));
    }
}
