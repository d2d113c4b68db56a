//! Custom test assertions for integration tests

use game_ingest::{Event, Pipeline, TaskId, TaskStatus};
use std::time::Duration;
use tokio::sync::broadcast::Receiver;

/// Result of waiting for a task to finish
#[derive(Debug)]
pub enum WaitResult {
    /// Task completed and was placed at this destination
    Completed(String),
    /// Task failed permanently with error
    Failed(String),
    /// Timeout waiting for a terminal event
    Timeout,
    /// Channel closed unexpectedly
    ChannelClosed,
}

/// Wait for a Completed or Failed event for `id`, collecting every event seen
pub async fn wait_for_terminal(
    events: &mut Receiver<Event>,
    id: TaskId,
    timeout: Duration,
) -> (WaitResult, Vec<Event>) {
    let mut seen = Vec::new();

    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(event) => {
                    seen.push(event.clone());
                    match event {
                        Event::Completed {
                            id: event_id,
                            destination,
                        } if event_id == id => {
                            return WaitResult::Completed(destination.display().to_string());
                        }
                        Event::Failed {
                            id: event_id,
                            error,
                        } if event_id == id => {
                            return WaitResult::Failed(error);
                        }
                        _ => continue,
                    }
                }
                Err(_) => return WaitResult::ChannelClosed,
            }
        }
    })
    .await;

    (result.unwrap_or(WaitResult::Timeout), seen)
}

/// Progress values reported for `id`, in order
pub fn progress_values(events: &[Event], id: TaskId) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Progress {
                id: event_id,
                progress,
            } if *event_id == id => Some(*progress),
            _ => None,
        })
        .collect()
}

/// Assert the stored status of a task
pub async fn assert_status(pipeline: &Pipeline, id: TaskId, expected: TaskStatus) {
    let task = pipeline.get_task(id).await.expect("task exists");
    assert_eq!(
        task.status, expected,
        "task {} is {} (error: {:?})",
        id, task.status, task.error
    );
}
