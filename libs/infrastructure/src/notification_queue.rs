use async_trait::async_trait;
use chipper_core::contracts::PublicationEvent;
use chipper_core::error::ChipperError;
use chipper_core::traits::{EventStatus, NotificationQueue, QueuedEvent};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::time::Duration;
use uuid::Uuid;

/// Durable publication-event queue that utilizes SQLite in WAL Mode to allow
/// multi-threaded queue operations. Prevents concurrent access database
/// locking via busy_timeout.
///
/// Rows carry only the immutable event payload (ids and display strings), so
/// a queued notification never holds a live handle to mutable domain state.
#[derive(Clone)]
pub struct SqliteNotificationQueue {
    pool: SqlitePool,
}

impl SqliteNotificationQueue {
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

        let queue = Self { pool };
        queue.init_db().await?;
        Ok(queue)
    }

    async fn init_db(&self) -> Result<(), ChipperError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS notification_queue (
                id TEXT PRIMARY KEY,
                author_id TEXT NOT NULL,
                post_id TEXT NOT NULL,
                post_title TEXT NOT NULL,
                post_summary TEXT NOT NULL,
                status TEXT NOT NULL,
                error_message TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ChipperError::Infrastructure {
            reason: format!("Failed to create notification_queue table: {}", e),
        })?;

        Ok(())
    }

    pub fn pool_ref(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl NotificationQueue for SqliteNotificationQueue {
    async fn enqueue(&self, event: &PublicationEvent) -> Result<String, ChipperError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO notification_queue
             (id, author_id, post_id, post_title, post_summary, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&event.author_id)
        .bind(&event.post_id)
        .bind(&event.post_title)
        .bind(&event.post_summary)
        .bind(EventStatus::Pending.to_string())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| ChipperError::Infrastructure {
            reason: format!("Failed to enqueue publication event: {}", e),
        })?;

        Ok(id)
    }

    async fn dequeue(&self) -> Result<Option<QueuedEvent>, ChipperError> {
        // We use a transaction to safely mark an event as Processing
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ChipperError::Infrastructure {
                reason: format!("Failed to start transaction: {}", e),
            })?;

        let row = sqlx::query(
            "SELECT id, author_id, post_id, post_title, post_summary, status, error_message
             FROM notification_queue WHERE status = ? ORDER BY created_at ASC LIMIT 1",
        )
        .bind(EventStatus::Pending.to_string())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| ChipperError::Infrastructure {
            reason: format!("Failed to fetch pending event: {}", e),
        })?;

        let Some(r) = row else {
            return Ok(None);
        };

        let id: String = r.get("id");
        let now = Utc::now().to_rfc3339();

        // The status guard keeps a racing claimant from re-claiming the row
        let updated = sqlx::query(
            "UPDATE notification_queue SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(EventStatus::Processing.to_string())
        .bind(&now)
        .bind(&id)
        .bind(EventStatus::Pending.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| ChipperError::Infrastructure {
            reason: format!("Failed to update event status: {}", e),
        })?;

        tx.commit().await.map_err(|e| ChipperError::Infrastructure {
            reason: format!("Failed to commit transaction: {}", e),
        })?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        Ok(Some(QueuedEvent {
            id,
            event: PublicationEvent {
                author_id: r.get("author_id"),
                post_id: r.get("post_id"),
                post_title: r.get("post_title"),
                post_summary: r.get("post_summary"),
            },
            status: EventStatus::Processing,
            error_message: r.try_get("error_message").ok(),
        }))
    }

    async fn complete(&self, event_id: &str) -> Result<(), ChipperError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE notification_queue SET status = ?, updated_at = ? WHERE id = ?")
            .bind(EventStatus::Completed.to_string())
            .bind(&now)
            .bind(event_id)
            .execute(&self.pool)
            .await
            .map_err(|e| ChipperError::Infrastructure {
                reason: format!("Failed to complete event {}: {}", event_id, e),
            })?;
        Ok(())
    }

    async fn fail(&self, event_id: &str, reason: &str) -> Result<(), ChipperError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE notification_queue SET status = ?, error_message = ?, updated_at = ? WHERE id = ?",
        )
        .bind(EventStatus::Failed.to_string())
        .bind(reason)
        .bind(&now)
        .bind(event_id)
        .execute(&self.pool)
        .await
        .map_err(|e| ChipperError::Infrastructure {
            reason: format!("Failed to fail event {}: {}", event_id, e),
        })?;
        Ok(())
    }

    async fn reclaim_stalled(&self, timeout_minutes: i64) -> Result<u64, ChipperError> {
        // The cutoff is computed here so both sides compare in RFC 3339
        let cutoff = (Utc::now() - chrono::Duration::minutes(timeout_minutes)).to_rfc3339();
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "UPDATE notification_queue SET status = ?, updated_at = ?
             WHERE status = ? AND updated_at < ?",
        )
        .bind(EventStatus::Pending.to_string())
        .bind(&now)
        .bind(EventStatus::Processing.to_string())
        .bind(&cutoff)
        .execute(&self.pool)
        .await
        .map_err(|e| ChipperError::Infrastructure {
            reason: format!("Failed to reclaim stalled events: {}", e),
        })?;

        Ok(result.rows_affected())
    }
}
