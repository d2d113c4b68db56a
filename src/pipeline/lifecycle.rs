//! Startup recovery and shutdown coordination.

use crate::error::Result;
use crate::types::{Event, TaskStatus};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;

use super::Pipeline;

/// Message stored on tasks that were mid-run when the previous process exited
pub const INTERRUPTED_MESSAGE: &str = "interrupted by shutdown";

/// How long shutdown waits for the running task
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

impl Pipeline {
    /// Gracefully shut down the pipeline
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops admission (new submissions get [`crate::Error::ShuttingDown`])
    /// 2. Closes the work queue so the worker stops after its current task
    /// 3. Waits for the running task with a timeout (30 seconds)
    /// 4. Emits [`Event::Shutdown`]
    ///
    /// Tasks still queued stay `queued` in the task store and are picked up on
    /// the next start. A task still running after the timeout is marked failed
    /// by startup recovery.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        // 1. Stop accepting new paths
        self.admission.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new paths");

        // 2. Stop the worker once the current task is done
        self.queue.close();
        tracing::info!("Signaled queue worker to stop");

        // 3. Wait for the running task with timeout
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.wait_for_running_task()).await {
            Ok(()) => tracing::info!("Running task finished"),
            Err(_) => tracing::warn!(
                "Timeout waiting for running task, it will be marked failed on next start"
            ),
        }

        // 4. Emit shutdown event
        self.emit(Event::Shutdown);

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    async fn wait_for_running_task(&self) {
        while self.queue.running() > 0 {
            tracing::debug!("Waiting for running task to complete");
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Restore the queue from the task store
    ///
    /// Called on construction:
    /// 1. Tasks left `processing` by a previous process are marked failed
    /// 2. Tasks still `queued` are pushed back in FIFO order
    pub(crate) async fn recover_tasks(&self) -> Result<()> {
        let interrupted = self.db.fail_interrupted_tasks(INTERRUPTED_MESSAGE).await?;
        if interrupted > 0 {
            tracing::warn!(count = interrupted, "marked interrupted tasks as failed");
        }

        let queued = self.db.list_tasks_by_status(TaskStatus::Queued).await?;
        let count = queued.len();
        for task in queued {
            let id = task.task_id();
            self.queue.push(id).await;
            self.admission.seen.insert(PathBuf::from(task.path), id);
        }

        if count > 0 {
            tracing::info!(count, "re-queued tasks from previous run");
        }

        Ok(())
    }

    /// Whether new submissions are currently accepted
    pub fn is_accepting(&self) -> bool {
        self.admission.accepting_new.load(Ordering::SeqCst)
    }
}
