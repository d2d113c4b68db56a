//! Read-only lookups used by the HTTP API and embedding code.

use crate::db::Game;
use crate::error::{Error, Result, TaskError};
use crate::metadata::{GameMetadata, clean_search_query};
use crate::types::{QueueStats, TaskId, TaskInfo, TaskStatus};
use std::sync::atomic::Ordering;

use super::Pipeline;

impl Pipeline {
    /// Get a task by ID
    pub async fn get_task(&self, id: TaskId) -> Result<TaskInfo> {
        self.db
            .get_task(id)
            .await?
            .map(TaskInfo::from)
            .ok_or(Error::Task(TaskError::NotFound { id: id.0 }))
    }

    /// List tasks, newest first, optionally filtered by status
    pub async fn list_tasks(&self, status: Option<TaskStatus>) -> Result<Vec<TaskInfo>> {
        let tasks = match status {
            Some(status) => {
                let mut tasks = self.db.list_tasks_by_status(status).await?;
                tasks.reverse();
                tasks
            }
            None => self.db.list_tasks().await?,
        };
        Ok(tasks.into_iter().map(TaskInfo::from).collect())
    }

    /// Current progress for a task, 0 if the task is unknown
    pub async fn get_progress(&self, id: TaskId) -> Result<u8> {
        self.db.get_task_progress(id).await
    }

    /// Work queue statistics
    pub async fn queue_stats(&self) -> QueueStats {
        let accepting = self.admission.accepting_new.load(Ordering::SeqCst);
        self.queue.stats(accepting).await
    }

    /// Games placed into the library, sorted by name
    pub async fn list_games(&self) -> Result<Vec<Game>> {
        self.db.list_games().await
    }

    /// Search the metadata catalog
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the query is empty after cleaning.
    pub async fn search_metadata(&self, query: &str) -> Result<Vec<GameMetadata>> {
        if clean_search_query(query).is_empty() {
            return Err(Error::Validation("query is required".to_string()));
        }
        self.metadata.search(query).await
    }
}
