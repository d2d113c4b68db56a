//! Queue worker - drains the work queue one task at a time.

use crate::error::{Error, TaskError};
use crate::retry::run_with_retry;
use crate::types::{Event, TaskId, TaskStatus};
use std::path::Path;

use super::{Pipeline, ProcessOutcome};

impl Pipeline {
    /// Start the queue worker
    ///
    /// This method spawns a background task that continuously:
    /// 1. Waits for the next task in the FIFO queue
    /// 2. Skips it if it was cancelled (or otherwise left `queued`) meanwhile
    /// 3. Runs the processor, retrying the whole run on retryable failures
    /// 4. Repeats until [`Pipeline::shutdown`] closes the queue
    ///
    /// Only one task is processed at a time.
    pub fn start_worker(&self) -> tokio::task::JoinHandle<()> {
        let pipeline = self.clone();

        tokio::spawn(async move {
            tracing::info!("queue worker started");

            while let Some(id) = pipeline.queue.next().await {
                pipeline.run_queued_task(id).await;
            }

            tracing::info!("queue worker stopped");
        })
    }

    /// Process one dequeued task with the configured retry policy
    pub(crate) async fn run_queued_task(&self, id: TaskId) {
        let task = match self.db.get_task(id).await {
            Ok(Some(task)) => task,
            Ok(None) => {
                tracing::warn!(task_id = id.0, "dequeued task no longer exists");
                return;
            }
            Err(e) => {
                tracing::error!(task_id = id.0, error = %e, "failed to load dequeued task");
                return;
            }
        };

        if task.status() != TaskStatus::Queued {
            tracing::info!(
                task_id = id.0,
                status = %task.status(),
                "skipping task that is no longer queued"
            );
            return;
        }

        let _running = self.queue.begin_run();
        let retry = self.config.queue.retry.clone();

        let result = run_with_retry(&retry, |attempt| {
            let pipeline = self.clone();
            async move {
                if attempt > 1 {
                    tracing::info!(task_id = id.0, attempt, "retrying task");
                    pipeline.emit(Event::Retrying { id, attempt });
                }
                pipeline.process_task(id).await
            }
        })
        .await;

        match result {
            Ok(ProcessOutcome::Completed { .. }) | Ok(ProcessOutcome::AlreadyCompleted) => {}
            Err(Error::Task(TaskError::InvalidState { current_state, .. })) => {
                tracing::info!(task_id = id.0, %current_state, "task stopped before completion");
            }
            Err(e) => {
                let error = e.to_string();
                tracing::error!(task_id = id.0, %error, "task failed permanently");
                self.admission.seen.remove(Path::new(&task.path));
                self.emit(Event::Failed { id, error });
            }
        }
    }
}
