//! # ドメインエラー型
//!
//! `thiserror` を使い、すべてのドメインエラーに明確な型を付与する。
//! Iron Principles: 非テストコードでの `unwrap()` / `expect()` は禁止。

use thiserror::Error;

/// Chipper のドメインエラー
#[derive(Debug, Error)]
pub enum ChipperError {
    // === お気に入り ===
    #[error("自分自身をお気に入りにはできない (user: {user_id})")]
    SelfTarget { user_id: String },

    #[error("すでにお気に入り済み ({target_kind}:{target_id})")]
    AlreadyFavorited {
        target_kind: String,
        target_id: String,
    },

    #[error("お気に入りが存在しない ({target_kind}:{target_id})")]
    FavoriteNotFound {
        target_kind: String,
        target_id: String,
    },

    #[error("対象エンティティが存在しない ({target_kind}:{target_id})")]
    TargetMissing {
        target_kind: String,
        target_id: String,
    },

    // === 通知配送 ===
    #[error("通知配送に失敗 (recipient: {recipient}): {source}")]
    Delivery {
        recipient: String,
        #[source]
        source: anyhow::Error,
    },

    // === 設定 ===
    #[error("設定ファイル読み込みエラー: {source}")]
    ConfigLoad {
        #[source]
        source: anyhow::Error,
    },

    // === インフラ ===
    #[error("インフラ構造エラー: {reason}")]
    Infrastructure { reason: String },
}
