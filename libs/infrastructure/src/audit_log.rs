//! # AuditLog — 監査証跡システム
//!
//! SQLite を使用してお気に入り・解除操作の成功を追記専用で保存する。
//! 行は変更も削除もしない。

use async_trait::async_trait;
use chipper_core::error::ChipperError;
use chipper_core::traits::{AuditAction, AuditLog, TargetKind};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::time::Duration;

/// SQLite をバックエンドとする監査ログクライアント
pub struct SqliteAuditLog {
    pub db: sqlx::SqlitePool,
}

impl SqliteAuditLog {
    pub async fn new(db_path: &str) -> Result<Self, ChipperError> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_millis(5000));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| ChipperError::Infrastructure {
                reason: format!("Failed to connect to SQLite: {}", e),
            })?;

        // テーブルの初期化
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
                action TEXT NOT NULL,
                user_id TEXT NOT NULL,
                target_kind TEXT NOT NULL,
                target_id TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| ChipperError::Infrastructure {
            reason: format!("Failed to initialize audit log: {}", e),
        })?;

        Ok(Self { db: pool })
    }
}

#[async_trait]
impl AuditLog for SqliteAuditLog {
    async fn record(
        &self,
        action: AuditAction,
        user_id: &str,
        target_kind: TargetKind,
        target_id: &str,
    ) -> Result<(), ChipperError> {
        sqlx::query(
            "INSERT INTO audit_log (action, user_id, target_kind, target_id) VALUES (?, ?, ?, ?)",
        )
        .bind(action.to_string())
        .bind(user_id)
        .bind(target_kind.to_string())
        .bind(target_id)
        .execute(&self.db)
        .await
        .map_err(|e| ChipperError::Infrastructure {
            reason: format!("Audit insertion failed: {}", e),
        })?;

        Ok(())
    }
}
