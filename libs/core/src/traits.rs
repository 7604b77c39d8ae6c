//! # ドメイントレイト定義
//!
//! お気に入り台帳・コンテンツストア・通知キュー・配送チャネルの
//! インターフェースを定義する。具体実装は `libs/infrastructure` に配置する
//! （依存性逆転の原則）。

use crate::contracts::{NotificationPayload, PublicationEvent};
use crate::error::ChipperError;
use async_trait::async_trait;

/// お気に入り対象の種別タグ
///
/// ソースの多態リレーションを、タグ + 素のIDのペアとして表現する。
/// 解決はタグごとの明示的なルックアップ（`ContentStore`）で行う。
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TargetKind {
    Post,
    User,
}

impl ToString for TargetKind {
    fn to_string(&self) -> String {
        match self {
            TargetKind::Post => "Post".to_string(),
            TargetKind::User => "User".to_string(),
        }
    }
}

impl TargetKind {
    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "Post" => Some(TargetKind::Post),
            "User" => Some(TargetKind::User),
            _ => None,
        }
    }
}

/// お気に入りレコード
///
/// (user_id, target_kind, target_id) の三つ組は台帳全体で一意。
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Favorite {
    pub id: String,
    /// お気に入りしたアクター
    pub user_id: String,
    pub target_kind: TargetKind,
    pub target_id: String,
    /// RFC 3339 形式の作成日時
    pub created_at: String,
}

/// お気に入り台帳 (The Favorite Ledger)
///
/// お気に入りの存在についての唯一の真実源。一意性はストレージ層の
/// 複合 UNIQUE 制約で保証し、アプリケーション層のチェックは最適化に過ぎない。
#[async_trait]
pub trait FavoriteLedger: Send + Sync {
    /// 三つ組が存在するかを返す。副作用なし
    async fn exists(
        &self,
        user_id: &str,
        target_kind: TargetKind,
        target_id: &str,
    ) -> Result<bool, ChipperError>;

    /// 新規お気に入りを挿入する。重複は `AlreadyFavorited` で報告する。
    /// 同一三つ組の同時挿入は必ず 1勝1敗になる（UNIQUE 制約が裁定する）
    async fn insert(
        &self,
        user_id: &str,
        target_kind: TargetKind,
        target_id: &str,
    ) -> Result<Favorite, ChipperError>;

    /// お気に入りを削除し、行が消えたかどうかを返す。
    /// 存在しないお気に入りの削除はエラーではなく `false`
    async fn remove(
        &self,
        user_id: &str,
        target_kind: TargetKind,
        target_id: &str,
    ) -> Result<bool, ChipperError>;

    /// アクターのお気に入りを作成日時の昇順で返す（決定的な並び）
    async fn list_by_actor(&self, user_id: &str) -> Result<Vec<Favorite>, ChipperError>;

    /// 指定ユーザーを kind=User でお気に入りしているアクターIDの一覧
    /// （= フォロワー解決）
    async fn list_followers_of_user(&self, user_id: &str) -> Result<Vec<String>, ChipperError>;
}

/// ユーザーの表示属性
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// 投稿レコード
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PostRecord {
    pub id: String,
    /// 著者
    pub user_id: String,
    pub title: String,
    pub body: String,
    pub created_at: String,
}

/// コンテンツストア
///
/// お気に入り対象（投稿・ユーザー）の表示属性を種別ごとに解決する。
/// 複数件の解決は 1クエリのバッチ読みで行い、フォロワー1人ずつの
/// N+1 クエリを避ける。
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn fetch_user(&self, id: &str) -> Result<Option<UserProfile>, ChipperError>;

    /// 複数ユーザーを 1クエリで取得する。存在しないIDは黙って落ちる
    async fn fetch_users(&self, ids: &[String]) -> Result<Vec<UserProfile>, ChipperError>;

    async fn fetch_post(&self, id: &str) -> Result<Option<PostRecord>, ChipperError>;

    /// 複数投稿を 1クエリで取得する。存在しないIDは黙って落ちる
    async fn fetch_posts(&self, ids: &[String]) -> Result<Vec<PostRecord>, ChipperError>;

    async fn create_user(&self, name: &str, email: &str) -> Result<UserProfile, ChipperError>;

    /// email が未登録なら作成して `true`、既存なら何もせず `false`
    async fn insert_user_if_absent(&self, name: &str, email: &str) -> Result<bool, ChipperError>;

    async fn create_post(
        &self,
        author_id: &str,
        title: &str,
        body: &str,
    ) -> Result<PostRecord, ChipperError>;
}

/// キュー上のイベントステータス
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum EventStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ToString for EventStatus {
    fn to_string(&self) -> String {
        match self {
            EventStatus::Pending => "Pending".to_string(),
            EventStatus::Processing => "Processing".to_string(),
            EventStatus::Completed => "Completed".to_string(),
            EventStatus::Failed => "Failed".to_string(),
        }
    }
}

impl EventStatus {
    pub fn from_string(s: &str) -> Self {
        match s {
            "Processing" => EventStatus::Processing,
            "Completed" => EventStatus::Completed,
            "Failed" => EventStatus::Failed,
            _ => EventStatus::Pending,
        }
    }
}

/// キューから取り出した公開イベント
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct QueuedEvent {
    pub id: String,
    pub event: PublicationEvent,
    pub status: EventStatus,
    pub error_message: Option<String>,
}

/// 通知キュー
///
/// 公開イベントを永続化する作業キュー。ワーカープールが at-least-once
/// セマンティクスで消費する。ライブなドメインオブジェクトではなく
/// 不変のイベントペイロードのみを運ぶ。
#[async_trait]
pub trait NotificationQueue: Send + Sync {
    /// イベントをキューに追加 (Pending)。投稿のコミット後に呼ぶこと
    async fn enqueue(&self, event: &PublicationEvent) -> Result<String, ChipperError>;

    /// 次に処理すべき Pending イベントを 1件取得し、Processing に更新。
    /// 同時 dequeue が同じイベントを二重に掴むことはない
    async fn dequeue(&self) -> Result<Option<QueuedEvent>, ChipperError>;

    /// イベントを完了状態にする
    async fn complete(&self, event_id: &str) -> Result<(), ChipperError>;

    /// イベントを失敗状態にする
    async fn fail(&self, event_id: &str, reason: &str) -> Result<(), ChipperError>;

    /// 一定時間以上 Processing のまま放置されたイベントを Pending に戻す。
    /// 戻り値は回収した件数
    async fn reclaim_stalled(&self, timeout_minutes: i64) -> Result<u64, ChipperError>;
}

/// 配送チャネル
///
/// 1受信者分の通知を届ける。具体実装（メール等）はディスパッチャへ
/// 注入され、ロジックとトランスポートを独立にテスト可能にする。
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn deliver(&self, payload: &NotificationPayload) -> Result<(), ChipperError>;
}

/// 監査アクション種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Favorited,
    Unfavorited,
}

impl ToString for AuditAction {
    fn to_string(&self) -> String {
        match self {
            AuditAction::Favorited => "favorited".to_string(),
            AuditAction::Unfavorited => "unfavorited".to_string(),
        }
    }
}

/// 監査ログ
///
/// お気に入り操作の成功を追記専用で記録する
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(
        &self,
        action: AuditAction,
        user_id: &str,
        target_kind: TargetKind,
        target_id: &str,
    ) -> Result<(), ChipperError>;
}
