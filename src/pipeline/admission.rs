//! Path admission, dedup and cancellation.

use crate::error::{Error, Result, TaskError};
use crate::paths::normalize_download_path;
use crate::types::{Event, TaskId, TaskInfo, TaskStatus};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use super::Pipeline;

/// Paths admitted by this process, keyed by normalized path
///
/// An entry short-circuits a resubmission without a path lookup in the task
/// store. Entries are dropped when their task is cancelled or fails for good.
#[derive(Clone, Debug, Default)]
pub(crate) struct SeenPaths {
    inner: Arc<Mutex<HashMap<PathBuf, TaskId>>>,
}

impl SeenPaths {
    pub(crate) fn get(&self, path: &Path) -> Option<TaskId> {
        self.lock().get(path).copied()
    }

    pub(crate) fn insert(&self, path: PathBuf, id: TaskId) {
        self.lock().insert(path, id);
    }

    pub(crate) fn remove(&self, path: &Path) -> bool {
        self.lock().remove(path).is_some()
    }

    pub(crate) fn clear(&self) -> usize {
        let mut seen = self.lock();
        let count = seen.len();
        seen.clear();
        count
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, TaskId>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Whether an existing task makes a new submission of its path a no-op
fn blocks_resubmission(status: TaskStatus) -> bool {
    matches!(
        status,
        TaskStatus::Queued | TaskStatus::Processing | TaskStatus::Completed
    )
}

impl Pipeline {
    /// Submit a path for ingestion
    ///
    /// The path may be absolute or relative to the downloads root. If the
    /// path already has a queued, processing or completed task, that task is
    /// returned unchanged. The same holds for a task the worker is still
    /// retrying. Otherwise a new task is created and queued.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for an empty path
    /// - [`Error::PathNotFound`] if the normalized path does not exist
    /// - [`Error::ShuttingDown`] once shutdown has started
    pub async fn submit(&self, input: &str) -> Result<TaskInfo> {
        if !self.admission.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let input = input.trim();
        if input.is_empty() {
            return Err(Error::Validation("path is required".to_string()));
        }

        let path = normalize_download_path(input, &self.config.paths.downloads_dir);
        if tokio::fs::metadata(&path).await.is_err() {
            return Err(Error::PathNotFound { path });
        }

        let _guard = self.admission.lock.lock().await;

        // A seen entry stays until the worker gives up on the task or it is
        // cancelled, so a task failing between retry attempts still holds its path
        if let Some(id) = self.admission.seen.get(&path) {
            match self.db.get_task(id).await? {
                Some(task) if task.status() != TaskStatus::Cancelled => {
                    tracing::debug!(
                        task_id = id.0,
                        status = %task.status(),
                        path = %path.display(),
                        "path already admitted"
                    );
                    return Ok(task.into());
                }
                _ => {
                    self.admission.seen.remove(&path);
                }
            }
        }

        if let Some(task) = self.db.find_latest_task_by_path(&path).await?
            && blocks_resubmission(task.status())
        {
            tracing::info!(
                task_id = task.id,
                status = %task.status(),
                path = %path.display(),
                "path already has a task, not queuing again"
            );
            return Ok(task.into());
        }

        let id = self.db.insert_task(&path).await?;
        self.db
            .update_task_status(id, TaskStatus::Queued, None)
            .await?;
        self.queue.push(id).await;
        self.admission.seen.insert(path.clone(), id);

        tracing::info!(task_id = id.0, path = %path.display(), "task queued");
        self.emit(Event::Queued {
            id,
            path: path.clone(),
        });

        self.get_task(id).await
    }

    /// Cancel a task that has not finished
    ///
    /// Cancellation is cooperative: a queued task is dropped from the queue
    /// and skipped, while a running extraction is left to finish its current
    /// attempt.
    ///
    /// # Errors
    ///
    /// - [`TaskError::NotFound`] for an unknown ID
    /// - [`TaskError::InvalidState`] if the task is completed or failed
    pub async fn cancel(&self, id: TaskId) -> Result<TaskInfo> {
        let task = self
            .db
            .get_task(id)
            .await?
            .ok_or(Error::Task(TaskError::NotFound { id: id.0 }))?;

        let status = task.status();
        if !status.is_cancellable() {
            return Err(Error::Task(TaskError::InvalidState {
                id: id.0,
                operation: "cancel".to_string(),
                current_state: status.to_string(),
            }));
        }

        self.db
            .update_task_status(id, TaskStatus::Cancelled, None)
            .await?;
        self.queue.remove(id).await;
        self.admission.seen.remove(Path::new(&task.path));

        if status == TaskStatus::Processing {
            tracing::warn!(
                task_id = id.0,
                "task cancelled while processing, the running attempt will finish"
            );
        } else {
            tracing::info!(task_id = id.0, "task cancelled");
        }
        self.emit(Event::Cancelled { id });

        self.get_task(id).await
    }

    /// All tasks currently being processed
    pub async fn processing_tasks(&self) -> Result<Vec<TaskInfo>> {
        let tasks = self.db.list_tasks_by_status(TaskStatus::Processing).await?;
        Ok(tasks.into_iter().map(TaskInfo::from).collect())
    }

    /// Forget every admitted path
    ///
    /// Returns the number of entries cleared. Dedup still applies through the
    /// task store.
    pub fn clear_seen(&self) -> usize {
        let cleared = self.admission.seen.clear();
        tracing::info!(cleared, "cleared admitted path set");
        cleared
    }

    /// Number of paths admitted by this process and still tracked
    pub fn seen_count(&self) -> usize {
        self.admission.seen.len()
    }
}
