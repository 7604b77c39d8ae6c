use async_trait::async_trait;
use chipper_core::error::ChipperError;
use chipper_core::traits::{ContentStore, PostRecord, UserProfile};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::time::Duration;
use uuid::Uuid;

/// SQLite-backed store for the user and post display attributes the favoriting
/// core joins against. Target deletion is owned by outside collaborators, so
/// every lookup here treats a missing row as a normal outcome, never an error.
#[derive(Clone)]
pub struct SqliteContentStore {
    pool: SqlitePool,
}

impl SqliteContentStore {
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

        let store = Self { pool };
        store.init_db().await?;
        Ok(store)
    }

    async fn init_db(&self) -> Result<(), ChipperError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ChipperError::Infrastructure {
            reason: format!("Failed to create users table: {}", e),
        })?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS posts (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at TEXT NOT NULL
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ChipperError::Infrastructure {
            reason: format!("Failed to create posts table: {}", e),
        })?;

        Ok(())
    }

    pub fn pool_ref(&self) -> &SqlitePool {
        &self.pool
    }

    fn row_to_user(r: &sqlx::sqlite::SqliteRow) -> UserProfile {
        UserProfile {
            id: r.get("id"),
            name: r.get("name"),
            email: r.get("email"),
        }
    }

    fn row_to_post(r: &sqlx::sqlite::SqliteRow) -> PostRecord {
        PostRecord {
            id: r.get("id"),
            user_id: r.get("user_id"),
            title: r.get("title"),
            body: r.get("body"),
            created_at: r.get("created_at"),
        }
    }
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    async fn fetch_user(&self, id: &str) -> Result<Option<UserProfile>, ChipperError> {
        let row = sqlx::query("SELECT id, name, email FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ChipperError::Infrastructure {
                reason: format!("Failed to fetch user: {}", e),
            })?;

        Ok(row.as_ref().map(Self::row_to_user))
    }

    async fn fetch_users(&self, ids: &[String]) -> Result<Vec<UserProfile>, ChipperError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // Single batch query instead of one lookup per id
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT id, name, email FROM users WHERE id IN ({})",
            placeholders
        );

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ChipperError::Infrastructure {
                reason: format!("Failed to batch fetch users: {}", e),
            })?;

        Ok(rows.iter().map(Self::row_to_user).collect())
    }

    async fn fetch_post(&self, id: &str) -> Result<Option<PostRecord>, ChipperError> {
        let row = sqlx::query("SELECT id, user_id, title, body, created_at FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ChipperError::Infrastructure {
                reason: format!("Failed to fetch post: {}", e),
            })?;

        Ok(row.as_ref().map(Self::row_to_post))
    }

    async fn fetch_posts(&self, ids: &[String]) -> Result<Vec<PostRecord>, ChipperError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT id, user_id, title, body, created_at FROM posts WHERE id IN ({})",
            placeholders
        );

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ChipperError::Infrastructure {
                reason: format!("Failed to batch fetch posts: {}", e),
            })?;

        Ok(rows.iter().map(Self::row_to_post).collect())
    }

    async fn create_user(&self, name: &str, email: &str) -> Result<UserProfile, ChipperError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query("INSERT INTO users (id, name, email, created_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(name)
            .bind(email)
            .bind(&now)
            .execute(&self.pool)
            .await
            .map_err(|e| ChipperError::Infrastructure {
                reason: format!("Failed to create user: {}", e),
            })?;

        Ok(UserProfile {
            id,
            name: name.to_string(),
            email: email.to_string(),
        })
    }

    async fn insert_user_if_absent(&self, name: &str, email: &str) -> Result<bool, ChipperError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        // The UNIQUE index on email makes this a first-or-create
        let result = sqlx::query(
            "INSERT OR IGNORE INTO users (id, name, email, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(name)
        .bind(email)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| ChipperError::Infrastructure {
            reason: format!("Failed to import user: {}", e),
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_post(
        &self,
        author_id: &str,
        title: &str,
        body: &str,
    ) -> Result<PostRecord, ChipperError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query("INSERT INTO posts (id, user_id, title, body, created_at) VALUES (?, ?, ?, ?, ?)")
            .bind(&id)
            .bind(author_id)
            .bind(title)
            .bind(body)
            .bind(&now)
            .execute(&self.pool)
            .await
            .map_err(|e| ChipperError::Infrastructure {
                reason: format!("Failed to create post: {}", e),
            })?;

        Ok(PostRecord {
            id,
            user_id: author_id.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            created_at: now,
        })
    }
}
