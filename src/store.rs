//! Persistence adapter for notes and tasks.
//!
//! Two append-mostly collections keyed by user id. Records are immutable once
//! written; the only destructive operation is a per-user bulk delete. The pool
//! is created once at startup and shared by every handler.

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr as _;

/// Error from a storage operation.
#[derive(Debug, thiserror::Error)]
#[error("storage operation failed: {0}")]
pub struct StoreError(#[from] sqlx::Error);

pub type Result<T> = std::result::Result<T, StoreError>;

/// A saved note. Never mutated after insertion.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Note {
    pub user_id: i64,
    pub text: String,
    /// Creation time, unix milliseconds.
    pub created_at: i64,
}

/// A saved task. The status field is fixed at creation; no command
/// transitions it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Task {
    pub user_id: i64,
    pub text: String,
    pub status: TaskStatus,
    /// Creation time, unix milliseconds.
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
        }
    }
}

/// Render a unix-millisecond timestamp as a `YYYY-MM-DD` date.
pub fn format_date(ts_ms: i64) -> String {
    chrono::DateTime::<Utc>::from_timestamp_millis(ts_ms)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| ts_ms.to_string())
}

/// Handle to the notes/tasks store.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open the store at the given connection string, creating the database
    /// and schema when missing.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(StoreError)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// In-memory store for tests. A single connection keeps the database
    /// alive and shared across queries.
    #[cfg(test)]
    pub(crate) async fn memory() -> Self {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = Self { pool };
        store.init_schema().await.unwrap();
        store
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                text TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                text TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_notes_user ON notes(user_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tasks_user ON tasks(user_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn add_note(&self, user_id: i64, text: &str) -> Result<()> {
        sqlx::query("INSERT INTO notes (user_id, text, created_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(text)
            .bind(Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Insert a task. New tasks always start out pending.
    pub async fn add_task(&self, user_id: i64, text: &str) -> Result<()> {
        sqlx::query("INSERT INTO tasks (user_id, text, status, created_at) VALUES (?, ?, ?, ?)")
            .bind(user_id)
            .bind(text)
            .bind(TaskStatus::Pending)
            .bind(Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// All notes owned by `user_id`, newest first.
    pub async fn notes_for(&self, user_id: i64) -> Result<Vec<Note>> {
        let notes = sqlx::query_as(
            "SELECT user_id, text, created_at FROM notes
             WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(notes)
    }

    /// All tasks owned by `user_id`, newest first.
    pub async fn tasks_for(&self, user_id: i64) -> Result<Vec<Task>> {
        let tasks = sqlx::query_as(
            "SELECT user_id, text, status, created_at FROM tasks
             WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tasks)
    }

    /// Delete every note owned by `user_id`, returning the count removed.
    pub async fn delete_notes(&self, user_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM notes WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete every task owned by `user_id`, returning the count removed.
    pub async fn delete_tasks(&self, user_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM tasks WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notes_newest_first() {
        let store = Store::memory().await;
        store.add_note(1, "Call John").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.add_note(1, "Buy milk").await.unwrap();

        let notes = store.notes_for(1).await.unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].text, "Buy milk");
        assert_eq!(notes[1].text, "Call John");
    }

    #[tokio::test]
    async fn test_cross_user_isolation() {
        let store = Store::memory().await;
        store.add_note(1, "mine").await.unwrap();
        store.add_task(1, "also mine").await.unwrap();

        assert!(store.notes_for(2).await.unwrap().is_empty());
        assert!(store.tasks_for(2).await.unwrap().is_empty());
        assert_eq!(store.delete_notes(2).await.unwrap(), 0);
        assert_eq!(store.notes_for(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_tasks_default_pending() {
        let store = Store::memory().await;
        store.add_task(7, "Submit report").await.unwrap();

        let tasks = store.tasks_for(7).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn test_delete_reports_count_then_zero() {
        let store = Store::memory().await;
        for i in 0..3 {
            store.add_task(9, &format!("task {i}")).await.unwrap();
        }

        assert_eq!(store.delete_tasks(9).await.unwrap(), 3);
        assert_eq!(store.delete_tasks(9).await.unwrap(), 0);
    }

    #[test]
    fn test_format_date() {
        // 2024-01-15 00:00:00 UTC
        assert_eq!(format_date(1_705_276_800_000), "2024-01-15");
    }
}
