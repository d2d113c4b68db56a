//! Task store operations.

use crate::error::DatabaseError;
use crate::types::{TaskId, TaskStatus};
use crate::{Error, Result};
use std::path::Path;

use super::{Database, Task};

const TASK_COLUMNS: &str = r#"
    id, path, status, progress, error, game_name, version,
    destination_path, created_at, updated_at
"#;

impl Database {
    /// Insert a new task for a normalized path (status `new`, progress 0)
    pub async fn insert_task(&self, path: &Path) -> Result<TaskId> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO tasks (path, status, progress, created_at, updated_at)
            VALUES (?, ?, 0, ?, ?)
            "#,
        )
        .bind(path.to_string_lossy().into_owned())
        .bind(TaskStatus::New.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert task: {}",
                e
            )))
        })?;

        Ok(TaskId(result.last_insert_rowid()))
    }

    /// Get a task by ID
    pub async fn get_task(&self, id: TaskId) -> Result<Option<Task>> {
        let row = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE id = ?",
            TASK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get task: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Most recent task for an exact normalized path
    pub async fn find_latest_task_by_path(&self, path: &Path) -> Result<Option<Task>> {
        let row = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE path = ? ORDER BY created_at DESC, id DESC LIMIT 1",
            TASK_COLUMNS
        ))
        .bind(path.to_string_lossy().into_owned())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to find task by path: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Update a task's status
    ///
    /// The error message is stored only for `failed`; every other status
    /// clears it.
    pub async fn update_task_status(
        &self,
        id: TaskId,
        status: TaskStatus,
        error: Option<&str>,
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let error = if status == TaskStatus::Failed {
            error
        } else {
            None
        };

        sqlx::query("UPDATE tasks SET status = ?, error = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(error)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to update task status: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Raise a task's progress
    ///
    /// Values are clamped to 100 and never lower the stored progress, so
    /// readers always observe a non-decreasing sequence.
    pub async fn update_task_progress(&self, id: TaskId, progress: u8) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            "UPDATE tasks SET progress = MAX(progress, ?), updated_at = ? WHERE id = ?",
        )
        .bind(i64::from(progress.min(100)))
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to update task progress: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Current progress for a task, 0 if the task is unknown
    pub async fn get_task_progress(&self, id: TaskId) -> Result<u8> {
        let progress: Option<i64> = sqlx::query_scalar("SELECT progress FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to get task progress: {}",
                    e
                )))
            })?;

        Ok(progress.unwrap_or(0).clamp(0, 100) as u8)
    }

    /// Record the game name and version derived for a task
    pub async fn set_task_release(&self, id: TaskId, game_name: &str, version: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query("UPDATE tasks SET game_name = ?, version = ?, updated_at = ? WHERE id = ?")
            .bind(game_name)
            .bind(version)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to set task release: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Record the library directory a task was placed into
    pub async fn set_task_destination(&self, id: TaskId, destination: &Path) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query("UPDATE tasks SET destination_path = ?, updated_at = ? WHERE id = ?")
            .bind(destination.to_string_lossy().into_owned())
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to set task destination: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// List all tasks, newest first
    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        let rows = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks ORDER BY created_at DESC, id DESC",
            TASK_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list tasks: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// List tasks with a given status, oldest first
    pub async fn list_tasks_by_status(&self, status: TaskStatus) -> Result<Vec<Task>> {
        let rows = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE status = ? ORDER BY created_at ASC, id ASC",
            TASK_COLUMNS
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list tasks by status: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Mark every `processing` task as failed with the given message
    ///
    /// Used at startup for tasks whose worker died with the previous process.
    /// Returns the number of tasks updated.
    pub async fn fail_interrupted_tasks(&self, message: &str) -> Result<u64> {
        let now = chrono::Utc::now().timestamp();

        let result =
            sqlx::query("UPDATE tasks SET status = ?, error = ?, updated_at = ? WHERE status = ?")
                .bind(TaskStatus::Failed.as_str())
                .bind(message)
                .bind(now)
                .bind(TaskStatus::Processing.as_str())
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to fail interrupted tasks: {}",
                        e
                    )))
                })?;

        Ok(result.rows_affected())
    }
}
