// src/services/progress.rs

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

use crate::{
    config::PROGRESS_KEY,
    error::QuizError,
    models::{
        progress::{ProgressData, QuizAttemptRecord},
        subject::{Difficulty, Subject},
    },
};

/// Opaque durable key-value persistence.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, QuizError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), QuizError>;
    async fn remove(&self, key: &str) -> Result<(), QuizError>;
}

/// `kv_store` table in SQLite.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects and applies the embedded migrations.
    ///
    /// An in-memory database lives only as long as its connection, so it gets
    /// a single connection that is never recycled.
    pub async fn connect(database_url: &str) -> Result<Self, QuizError> {
        let in_memory = database_url.contains(":memory:");

        let options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(3))
        };

        let pool = options.connect(database_url).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| QuizError::Persistence(e.to_string()))?;

        Ok(Self::new(pool))
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, QuizError> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), QuizError> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), QuizError> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Per-subject quiz history kept as one JSON record.
#[derive(Clone)]
pub struct ProgressStore {
    store: Arc<dyn KeyValueStore>,
}

impl ProgressStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Reads the record. Malformed JSON counts as absent; storage failures propagate.
    async fn load(&self) -> Result<ProgressData, QuizError> {
        let Some(raw) = self.store.get(PROGRESS_KEY).await? else {
            return Ok(ProgressData::default());
        };

        match serde_json::from_str(&raw) {
            Ok(progress) => Ok(progress),
            Err(e) => {
                tracing::warn!("Stored progress is malformed, treating as empty: {}", e);
                Ok(ProgressData::default())
            }
        }
    }

    /// Current history, or the empty default if it cannot be read.
    pub async fn get_progress(&self) -> ProgressData {
        match self.load().await {
            Ok(progress) => progress,
            Err(e) => {
                tracing::error!("Failed to load progress: {}", e);
                ProgressData::default()
            }
        }
    }

    /// Appends one attempt for `subject` and rewrites the whole record.
    pub async fn save_quiz_result(
        &self,
        subject: Subject,
        difficulty: Difficulty,
        topic: &str,
        score: u32,
    ) -> Result<QuizAttemptRecord, QuizError> {
        let mut progress = self.load().await?;
        let record = QuizAttemptRecord::new(difficulty, topic, score, chrono::Utc::now());
        progress.push(subject, record.clone());

        let raw = serde_json::to_string(&progress)
            .map_err(|e| QuizError::Persistence(e.to_string()))?;
        self.store.set(PROGRESS_KEY, &raw).await?;

        tracing::info!(%subject, %difficulty, topic, score, "Quiz result saved");
        Ok(record)
    }

    pub async fn clear_progress(&self) -> Result<(), QuizError> {
        self.store.remove(PROGRESS_KEY).await?;
        tracing::info!("Progress cleared");
        Ok(())
    }
}
