//! Per-task stage machine: naming, metadata, extraction, placement, cleanup.

use crate::db::{Database, NewGame};
use crate::error::{Error, Result, TaskError};
use crate::metadata::GameMetadata;
use crate::naming::{ReleaseName, parse_release_name};
use crate::paths::release_label;
use crate::placement::{place_files, remove_workspace, stage_source};
use crate::types::{Event, Stage, TaskId, TaskStatus};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

use super::Pipeline;

/// Share of overall task progress covered by the extraction stage (20 to 80)
const EXTRACTION_SPAN: f64 = 0.6;

/// Result of a successful processing run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Content was placed into the library
    Completed {
        /// Final library directory
        destination: PathBuf,
    },
    /// The task had already completed; nothing was done
    AlreadyCompleted,
}

/// Map extraction-stage progress (0-100) into overall task progress (20-80)
pub fn extraction_to_task_progress(percent: u8) -> u8 {
    let start = Stage::Metadata.checkpoint();
    let offset = (f64::from(percent.min(100)) * EXTRACTION_SPAN).round() as u8;
    start + offset
}

impl Pipeline {
    /// Run one processing attempt for a task
    ///
    /// A completed task short-circuits with [`ProcessOutcome::AlreadyCompleted`].
    /// Any stage error marks the task failed with the error message and is
    /// returned so the worker can retry the whole run.
    pub async fn process_task(&self, id: TaskId) -> Result<ProcessOutcome> {
        let task = self
            .db
            .get_task(id)
            .await?
            .ok_or(Error::Task(TaskError::NotFound { id: id.0 }))?;

        match task.status() {
            TaskStatus::Completed => {
                tracing::info!(task_id = id.0, "task already completed, nothing to do");
                return Ok(ProcessOutcome::AlreadyCompleted);
            }
            TaskStatus::Cancelled => {
                return Err(Error::Task(TaskError::InvalidState {
                    id: id.0,
                    operation: "process".to_string(),
                    current_state: TaskStatus::Cancelled.to_string(),
                }));
            }
            _ => {}
        }

        self.db
            .update_task_status(id, TaskStatus::Processing, None)
            .await?;
        self.emit(Event::Started { id });

        let source = PathBuf::from(&task.path);
        tracing::info!(task_id = id.0, path = %source.display(), "processing task");

        match self.run_stages(id, &source).await {
            Ok(destination) => {
                self.db
                    .update_task_status(id, TaskStatus::Completed, None)
                    .await?;
                tracing::info!(
                    task_id = id.0,
                    destination = %destination.display(),
                    "task completed"
                );
                self.emit(Event::Completed {
                    id,
                    destination: destination.clone(),
                });
                Ok(ProcessOutcome::Completed { destination })
            }
            Err(e) => {
                let message = e.to_string();
                tracing::error!(task_id = id.0, error = %message, "processing attempt failed");
                if let Err(db_err) = self
                    .db
                    .update_task_status(id, TaskStatus::Failed, Some(&message))
                    .await
                {
                    tracing::error!(task_id = id.0, error = %db_err, "failed to record task failure");
                }
                Err(e)
            }
        }
    }

    async fn run_stages(&self, id: TaskId, source: &Path) -> Result<PathBuf> {
        // Naming
        self.enter_stage(id, Stage::Naming);
        // A missing source is reported by the extraction stage
        let is_file = tokio::fs::metadata(source)
            .await
            .is_ok_and(|meta| !meta.is_dir());
        let release = parse_release_name(&release_label(source, is_file));
        tracing::info!(
            task_id = id.0,
            game = %release.game_name,
            version = %release.version,
            "derived release name"
        );
        self.db
            .set_task_release(id, &release.game_name, &release.version)
            .await?;
        self.checkpoint(id, Stage::Naming).await?;

        // Metadata
        self.enter_stage(id, Stage::Metadata);
        let metadata = self.lookup_metadata(id, &release).await;
        self.checkpoint(id, Stage::Metadata).await?;

        // Extraction
        self.enter_stage(id, Stage::Extracting);
        let source_meta = tokio::fs::metadata(source)
            .await
            .map_err(|_| Error::PathNotFound {
                path: source.to_path_buf(),
            })?;
        let workspace = self.config.paths.extract_dir.join(id.to_string());
        // Leftovers from an earlier attempt
        remove_workspace(&workspace).await;

        let extracted = if source_meta.is_dir() {
            self.extract_with_progress(id, source, &workspace).await?
        } else {
            false
        };
        if !extracted {
            let copied = stage_source(source, &workspace).await?;
            tracing::info!(
                task_id = id.0,
                files = copied,
                "no archives extracted, using source contents as payload"
            );
        }
        self.checkpoint(id, Stage::Extracting).await?;

        // Placement
        self.enter_stage(id, Stage::Placing);
        let destination = place_files(
            &workspace,
            &self.config.paths.library_dir,
            &release.game_name,
            &release.version,
        )
        .await?;
        self.db.set_task_destination(id, &destination).await?;
        self.db
            .upsert_game(&new_game(&release, metadata.as_ref(), &destination))
            .await?;
        self.checkpoint(id, Stage::Placing).await?;

        // Cleanup
        self.enter_stage(id, Stage::Cleanup);
        remove_workspace(&workspace).await;
        self.checkpoint(id, Stage::Cleanup).await?;

        Ok(destination)
    }

    async fn lookup_metadata(&self, id: TaskId, release: &ReleaseName) -> Option<GameMetadata> {
        match self.metadata.search(&release.game_name).await {
            Ok(matches) => match matches.into_iter().next() {
                Some(found) => {
                    tracing::info!(
                        task_id = id.0,
                        title = %found.name,
                        source = %found.source,
                        "metadata match found"
                    );
                    Some(found)
                }
                None => {
                    tracing::warn!(
                        task_id = id.0,
                        game = %release.game_name,
                        provider = self.metadata.name(),
                        "no metadata found, continuing without enrichment"
                    );
                    None
                }
            },
            Err(e) => {
                tracing::warn!(
                    task_id = id.0,
                    error = %e,
                    "metadata lookup failed, continuing without enrichment"
                );
                None
            }
        }
    }

    /// Extract `source` into `workspace`, persisting progress off the output path
    ///
    /// Extraction progress is published into a watch channel and a separate
    /// writer task persists the latest value. Values at or below the stored
    /// progress are dropped.
    async fn extract_with_progress(
        &self,
        id: TaskId,
        source: &Path,
        workspace: &Path,
    ) -> Result<bool> {
        let floor = self.db.get_task_progress(id).await?;
        let (progress_tx, progress_rx) = watch::channel(floor);
        let writer = tokio::spawn(persist_progress(
            Arc::clone(&self.db),
            self.event_tx.clone(),
            id,
            progress_rx,
        ));

        let result = {
            let on_progress = move |percent: u8| {
                let mapped = extraction_to_task_progress(percent);
                progress_tx.send_if_modified(|current| {
                    if mapped > *current {
                        *current = mapped;
                        true
                    } else {
                        false
                    }
                });
            };
            self.extraction
                .extract_archives(source, workspace, &on_progress)
                .await
        };

        if let Err(e) = writer.await {
            tracing::warn!(task_id = id.0, error = %e, "progress writer task failed");
        }

        result
    }

    fn enter_stage(&self, id: TaskId, stage: Stage) {
        tracing::info!(task_id = id.0, ?stage, "entering stage");
        self.emit(Event::Stage { id, stage });
    }

    /// Raise progress to the stage's checkpoint
    ///
    /// A retried run passes checkpoints it already reached; those are not
    /// written or announced again.
    async fn checkpoint(&self, id: TaskId, stage: Stage) -> Result<()> {
        let progress = stage.checkpoint();
        if progress <= self.db.get_task_progress(id).await? {
            return Ok(());
        }
        self.db.update_task_progress(id, progress).await?;
        self.emit(Event::Progress { id, progress });
        Ok(())
    }
}

/// Persist progress values from the watch channel until the sender is dropped
async fn persist_progress(
    db: Arc<Database>,
    event_tx: broadcast::Sender<Event>,
    id: TaskId,
    mut progress_rx: watch::Receiver<u8>,
) {
    let mut written = *progress_rx.borrow();

    loop {
        let closed = progress_rx.changed().await.is_err();
        let progress = *progress_rx.borrow_and_update();

        if progress > written {
            match db.update_task_progress(id, progress).await {
                Ok(()) => {
                    tracing::debug!(task_id = id.0, progress, "extraction progress");
                    event_tx.send(Event::Progress { id, progress }).ok();
                    written = progress;
                }
                Err(e) => {
                    tracing::warn!(task_id = id.0, error = %e, "failed to persist progress");
                }
            }
        }

        if closed {
            break;
        }
    }
}

fn new_game(release: &ReleaseName, metadata: Option<&GameMetadata>, destination: &Path) -> NewGame {
    NewGame {
        name: release.game_name.clone(),
        version: release.version.clone(),
        release_date: metadata.and_then(|m| m.release_date.clone()),
        description: metadata.and_then(|m| m.description.clone()),
        cover_url: metadata.and_then(|m| m.cover_url.clone()),
        destination_path: destination.to_string_lossy().into_owned(),
    }
}
