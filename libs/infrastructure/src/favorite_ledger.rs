use async_trait::async_trait;
use chipper_core::error::ChipperError;
use chipper_core::traits::{Favorite, FavoriteLedger, TargetKind};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::time::Duration;
use uuid::Uuid;

/// Favorite ledger that utilizes SQLite in WAL Mode to allow multi-threaded
/// operations. Prevents concurrent access database locking via busy_timeout.
///
/// The composite UNIQUE index on (user_id, target_kind, target_id) is the
/// single arbiter for duplicates: under concurrent inserts of the same triple
/// exactly one row wins and the loser surfaces `AlreadyFavorited`.
#[derive(Clone)]
pub struct SqliteFavoriteLedger {
    pool: SqlitePool,
}

impl SqliteFavoriteLedger {
    /// Connects to the SQLite database and initializes the WAL mode and schema.
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

        let ledger = Self { pool };
        ledger.init_db().await?;
        Ok(ledger)
    }

    async fn init_db(&self) -> Result<(), ChipperError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS favorites (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                target_kind TEXT NOT NULL,
                target_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (user_id, target_kind, target_id)
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ChipperError::Infrastructure {
            reason: format!("Failed to create favorites table: {}", e),
        })?;

        // Follower resolution scans by target
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_favorites_target
             ON favorites (target_kind, target_id);",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ChipperError::Infrastructure {
            reason: format!("Failed to create favorites target index: {}", e),
        })?;

        Ok(())
    }

    pub fn pool_ref(&self) -> &SqlitePool {
        &self.pool
    }

    fn row_to_favorite(r: &sqlx::sqlite::SqliteRow) -> Result<Favorite, ChipperError> {
        let kind_str: String = r.get("target_kind");
        let target_kind =
            TargetKind::from_string(&kind_str).ok_or_else(|| ChipperError::Infrastructure {
                reason: format!("Unknown target kind in ledger: {}", kind_str),
            })?;

        Ok(Favorite {
            id: r.get("id"),
            user_id: r.get("user_id"),
            target_kind,
            target_id: r.get("target_id"),
            created_at: r.get("created_at"),
        })
    }
}

#[async_trait]
impl FavoriteLedger for SqliteFavoriteLedger {
    async fn exists(
        &self,
        user_id: &str,
        target_kind: TargetKind,
        target_id: &str,
    ) -> Result<bool, ChipperError> {
        let row = sqlx::query(
            "SELECT 1 FROM favorites WHERE user_id = ? AND target_kind = ? AND target_id = ? LIMIT 1",
        )
        .bind(user_id)
        .bind(target_kind.to_string())
        .bind(target_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ChipperError::Infrastructure {
            reason: format!("Failed to check favorite existence: {}", e),
        })?;

        Ok(row.is_some())
    }

    async fn insert(
        &self,
        user_id: &str,
        target_kind: TargetKind,
        target_id: &str,
    ) -> Result<Favorite, ChipperError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO favorites (id, user_id, target_kind, target_id, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(target_kind.to_string())
        .bind(target_id)
        .bind(&now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(Favorite {
                id,
                user_id: user_id.to_string(),
                target_kind,
                target_id: target_id.to_string(),
                created_at: now,
            }),
            // The UNIQUE constraint lost a race to another request
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(ChipperError::AlreadyFavorited {
                    target_kind: target_kind.to_string(),
                    target_id: target_id.to_string(),
                })
            }
            Err(e) => Err(ChipperError::Infrastructure {
                reason: format!("Failed to insert favorite: {}", e),
            }),
        }
    }

    async fn remove(
        &self,
        user_id: &str,
        target_kind: TargetKind,
        target_id: &str,
    ) -> Result<bool, ChipperError> {
        let result = sqlx::query(
            "DELETE FROM favorites WHERE user_id = ? AND target_kind = ? AND target_id = ?",
        )
        .bind(user_id)
        .bind(target_kind.to_string())
        .bind(target_id)
        .execute(&self.pool)
        .await
        .map_err(|e| ChipperError::Infrastructure {
            reason: format!("Failed to remove favorite: {}", e),
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_by_actor(&self, user_id: &str) -> Result<Vec<Favorite>, ChipperError> {
        // rowid breaks ties between equal timestamps so pagination stays stable
        let rows = sqlx::query(
            "SELECT id, user_id, target_kind, target_id, created_at FROM favorites
             WHERE user_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ChipperError::Infrastructure {
            reason: format!("Failed to list favorites: {}", e),
        })?;

        let mut favorites = Vec::with_capacity(rows.len());
        for row in &rows {
            favorites.push(Self::row_to_favorite(row)?);
        }
        Ok(favorites)
    }

    async fn list_followers_of_user(&self, user_id: &str) -> Result<Vec<String>, ChipperError> {
        let rows = sqlx::query(
            "SELECT user_id FROM favorites
             WHERE target_kind = ? AND target_id = ?
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(TargetKind::User.to_string())
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ChipperError::Infrastructure {
            reason: format!("Failed to resolve followers: {}", e),
        })?;

        let mut followers = Vec::with_capacity(rows.len());
        for row in rows {
            let follower: String = row.get("user_id");
            followers.push(follower);
        }
        Ok(followers)
    }
}
