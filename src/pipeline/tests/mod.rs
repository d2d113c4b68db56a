use crate::db::Database;
use crate::error::{Error, TaskError};
use crate::metadata::{GameMetadata, MetadataProvider};
use crate::pipeline::test_helpers::*;
use crate::pipeline::*;
use crate::types::{Event, TaskId, TaskStatus};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Receive events until `pred` matches, collecting everything seen
async fn collect_until(
    rx: &mut broadcast::Receiver<Event>,
    pred: impl Fn(&Event) -> bool,
) -> Vec<Event> {
    let mut seen = Vec::new();
    let result = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.unwrap();
            let done = pred(&event);
            seen.push(event);
            if done {
                break;
            }
        }
    })
    .await;
    assert!(result.is_ok(), "timed out waiting for event, saw {:?}", seen);
    seen
}

fn progress_of(events: &[Event], id: TaskId) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Progress { id: eid, progress } if *eid == id => Some(*progress),
            _ => None,
        })
        .collect()
}

struct StaticMetadata(Vec<GameMetadata>);

#[async_trait]
impl MetadataProvider for StaticMetadata {
    async fn search(&self, _name: &str) -> crate::Result<Vec<GameMetadata>> {
        Ok(self.0.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

struct BrokenMetadata;

#[async_trait]
impl MetadataProvider for BrokenMetadata {
    async fn search(&self, _name: &str) -> crate::Result<Vec<GameMetadata>> {
        Err(Error::Metadata("catalog unreachable".into()))
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

// ---------------------------------------------------------------------------
// Admission
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_submit_queues_task() {
    let (pipeline, _dir) = create_test_pipeline().await;
    let source = make_release(&pipeline, "Some.Game.v1.2.3-CODEX", &[("a.txt", b"a")]);
    let mut events = pipeline.subscribe();

    let task = pipeline.submit(source.to_str().unwrap()).await.unwrap();

    assert_eq!(task.status, TaskStatus::Queued);
    assert_eq!(task.progress, 0);
    assert_eq!(task.path, source);
    assert_eq!(
        events.recv().await.unwrap(),
        Event::Queued {
            id: task.id,
            path: source
        }
    );

    let stats = pipeline.queue_stats().await;
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.running, 0);
    assert!(stats.accepting_new);
}

#[tokio::test]
async fn test_submit_is_idempotent_while_queued() {
    let (pipeline, _dir) = create_test_pipeline().await;
    let source = make_release(&pipeline, "Some.Game.v1.2.3-CODEX", &[("a.txt", b"a")]);

    let first = pipeline.submit(source.to_str().unwrap()).await.unwrap();
    // Different spelling of the same location
    let again = format!("{}/./", source.display());
    let second = pipeline.submit(&again).await.unwrap();
    let relative = pipeline.submit("Some.Game.v1.2.3-CODEX").await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.id, relative.id);
    assert_eq!(pipeline.list_tasks(None).await.unwrap().len(), 1);
    assert_eq!(pipeline.queue_stats().await.pending, 1);
}

#[tokio::test]
async fn test_store_dedups_when_seen_set_is_cleared() {
    let (pipeline, _dir) = create_test_pipeline().await;
    let source = make_release(&pipeline, "Racing.Sim.v7-PLAZA", &[("a.txt", b"a")]);

    let first = pipeline.submit(source.to_str().unwrap()).await.unwrap();
    assert_eq!(pipeline.seen_count(), 1);
    assert_eq!(pipeline.clear_seen(), 1);
    assert_eq!(pipeline.seen_count(), 0);

    let second = pipeline.submit(source.to_str().unwrap()).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(pipeline.queue_stats().await.pending, 1);
}

#[tokio::test]
async fn test_concurrent_submissions_create_one_task() {
    let (pipeline, _dir) = create_test_pipeline().await;
    let source = make_release(&pipeline, "Racing.Sim.v7-PLAZA", &[("a.txt", b"a")]);
    let input = source.to_string_lossy().into_owned();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pipeline = pipeline.clone();
            let input = input.clone();
            tokio::spawn(async move { pipeline.submit(&input).await.unwrap().id })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(pipeline.queue_stats().await.pending, 1);
}

#[tokio::test]
async fn test_submit_rejects_empty_path() {
    let (pipeline, _dir) = create_test_pipeline().await;

    let err = pipeline.submit("   ").await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_submit_missing_path_creates_no_task() {
    let (pipeline, _dir) = create_test_pipeline().await;

    let err = pipeline.submit("Not.There.v1.0-GRP").await.unwrap_err();

    match err {
        Error::PathNotFound { path } => {
            assert_eq!(path, pipeline.config.paths.downloads_dir.join("Not.There.v1.0-GRP"));
        }
        other => panic!("expected PathNotFound, got {:?}", other),
    }
    assert!(pipeline.list_tasks(None).await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_cancel_queued_task() {
    let (pipeline, _dir) = create_test_pipeline().await;
    let source = make_release(&pipeline, "Some.Game.v1.2.3-CODEX", &[("a.txt", b"a")]);
    let task = pipeline.submit(source.to_str().unwrap()).await.unwrap();

    let cancelled = pipeline.cancel(task.id).await.unwrap();

    assert_eq!(cancelled.status, TaskStatus::Cancelled);
    assert_eq!(pipeline.queue_stats().await.pending, 0);
    assert_eq!(pipeline.seen_count(), 0);

    // A cancelled path no longer blocks a new submission
    let again = pipeline.submit(source.to_str().unwrap()).await.unwrap();
    assert_ne!(again.id, task.id);
    assert_eq!(again.status, TaskStatus::Queued);
}

#[tokio::test]
async fn test_cancel_unknown_task_is_not_found() {
    let (pipeline, _dir) = create_test_pipeline().await;

    let err = pipeline.cancel(TaskId(999)).await.unwrap_err();
    assert!(matches!(err, Error::Task(TaskError::NotFound { id: 999 })));
}

#[tokio::test]
async fn test_cancel_finished_task_is_invalid_state() {
    let (pipeline, _dir) = create_test_pipeline().await;
    let source = make_release(&pipeline, "Some.Game.v1.2.3-CODEX", &[("a.txt", b"a")]);
    let task = pipeline.submit(source.to_str().unwrap()).await.unwrap();

    for status in [TaskStatus::Completed, TaskStatus::Failed] {
        pipeline
            .db
            .update_task_status(task.id, status, Some("boom"))
            .await
            .unwrap();

        let err = pipeline.cancel(task.id).await.unwrap_err();
        match err {
            Error::Task(TaskError::InvalidState { current_state, .. }) => {
                assert_eq!(current_state, status.as_str());
            }
            other => panic!("expected InvalidState, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_cancelled_task_is_skipped_at_dequeue() {
    let iso = Arc::new(ScriptedExtractor::new("iso"));
    let (pipeline, _dir) =
        create_test_pipeline_with(Arc::new(ScriptedExtractor::new("rar")), iso.clone()).await;
    let source = make_release(&pipeline, "Some.Game.v1.2.3-CODEX", &[("game.iso", b"iso")]);
    let task = pipeline.submit(source.to_str().unwrap()).await.unwrap();

    // Marked cancelled without leaving the in-memory queue
    pipeline
        .db
        .update_task_status(task.id, TaskStatus::Cancelled, None)
        .await
        .unwrap();
    pipeline.run_queued_task(task.id).await;

    let task = pipeline.get_task(task.id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Cancelled);
    assert!(iso.calls().is_empty());
}

// ---------------------------------------------------------------------------
// Processing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_end_to_end_iso_release() {
    let iso = Arc::new(
        ScriptedExtractor::new("iso")
            .with_steps(&[25, 50, 75])
            .with_file("setup.exe", b"MZ")
            .with_file("data/level1.pak", b"pak"),
    );
    let (pipeline, _dir) =
        create_test_pipeline_with(Arc::new(ScriptedExtractor::new("rar")), iso.clone()).await;
    let source = make_release(&pipeline, "Game.Title.v2.0.0-GROUP", &[("game.iso", b"iso")]);
    let mut events = pipeline.subscribe();
    let _worker = pipeline.start_worker();

    let task = pipeline.submit(source.to_str().unwrap()).await.unwrap();
    let seen = collect_until(&mut events, |e| matches!(e, Event::Completed { .. })).await;
    let task = pipeline.get_task(task.id).await.unwrap();

    let expected = pipeline
        .config
        .paths
        .library_dir
        .join("Game Title")
        .join("2.0.0");
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.progress, 100);
    assert_eq!(task.game_name.as_deref(), Some("Game Title"));
    assert_eq!(task.version.as_deref(), Some("2.0.0"));
    assert_eq!(task.destination.as_deref(), Some(expected.as_path()));
    assert!(task.error.is_none());

    assert!(expected.join("setup.exe").exists());
    assert!(expected.join("data").join("level1.pak").exists());
    assert!(!expected.join("game.iso").exists());

    // Workspace is gone
    let workspace = pipeline.config.paths.extract_dir.join(task.id.to_string());
    assert!(!workspace.exists());

    let game = pipeline
        .db
        .find_game_by_name("Game Title")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(game.latest_version.as_deref(), Some("2.0.0"));
    assert_eq!(game.destination_path, Some(expected.to_string_lossy().into_owned()));

    assert!(seen.contains(&Event::Started { id: task.id }));
    assert!(seen.contains(&Event::Completed {
        id: task.id,
        destination: expected
    }));
}

#[tokio::test]
async fn test_progress_is_monotonic_with_checkpoints() {
    let iso = Arc::new(
        ScriptedExtractor::new("iso")
            .with_steps(&[10, 40, 30, 90])
            .with_file("setup.exe", b"MZ"),
    );
    let (pipeline, _dir) =
        create_test_pipeline_with(Arc::new(ScriptedExtractor::new("rar")), iso).await;
    let source = make_release(&pipeline, "Racing.Sim.v7-PLAZA", &[("game.iso", b"iso")]);
    let mut events = pipeline.subscribe();
    let _worker = pipeline.start_worker();

    let task = pipeline.submit(source.to_str().unwrap()).await.unwrap();
    let seen = collect_until(&mut events, |e| matches!(e, Event::Completed { .. })).await;
    let progress = progress_of(&seen, task.id);

    assert!(
        progress.windows(2).all(|w| w[0] <= w[1]),
        "progress went backwards: {:?}",
        progress
    );
    for checkpoint in [10, 20, 80, 90, 100] {
        assert!(progress.contains(&checkpoint), "missing {} in {:?}", checkpoint, progress);
    }
    assert!(progress.iter().all(|p| *p <= 100));
    assert_eq!(pipeline.get_progress(task.id).await.unwrap(), 100);
}

#[tokio::test]
async fn test_rar_with_nested_iso_unnests_installer() {
    let rar = Arc::new(
        ScriptedExtractor::new("rar")
            .with_steps(&[50])
            .with_file("game.iso", b"image"),
    );
    let iso = Arc::new(ScriptedExtractor::new("iso").with_file("setup.exe", b"MZ"));
    let (pipeline, _dir) = create_test_pipeline_with(rar.clone(), iso.clone()).await;
    let source = make_release(
        &pipeline,
        "Some.Game.v1.2.3-CODEX",
        &[("game.part1.rar", b"1"), ("game.part2.rar", b"2")],
    );
    let _worker = pipeline.start_worker();

    let task = pipeline.submit(source.to_str().unwrap()).await.unwrap();
    let task = wait_for_status(&pipeline, task.id, TaskStatus::Completed).await;

    let dest = task.destination.unwrap();
    assert_eq!(rar.calls()[0].0, source.join("game.part1.rar"));
    // The image was extracted to <workspace>/game, which holds setup.exe
    assert!(dest.join("setup.exe").exists());
    assert!(!dest.join("game").exists());
    assert!(!dest.join("game.iso").exists());
}

#[tokio::test]
async fn test_release_without_archives_is_copied_as_payload() {
    let (pipeline, _dir) = create_test_pipeline().await;
    let source = make_release(
        &pipeline,
        "Racing.Sim.v7-PLAZA",
        &[
            ("installer/setup.exe", b"MZ"),
            ("readme.txt", b"hello"),
            ("docs/manual.txt", b"manual"),
        ],
    );
    let _worker = pipeline.start_worker();

    let task = pipeline.submit(source.to_str().unwrap()).await.unwrap();
    let task = wait_for_status(&pipeline, task.id, TaskStatus::Completed).await;

    let dest = task.destination.unwrap();
    assert_eq!(dest, pipeline.config.paths.library_dir.join("Racing Sim").join("7"));
    assert!(dest.join("setup.exe").exists());
    assert!(dest.join("readme.txt").exists());
    assert!(dest.join("docs").join("manual.txt").exists());
    // Source is left alone
    assert!(source.join("installer").join("setup.exe").exists());
}

#[tokio::test]
async fn test_single_file_source_is_named_without_extension() {
    let (pipeline, _dir) = create_test_pipeline().await;
    let downloads = &pipeline.config.paths.downloads_dir;
    std::fs::create_dir_all(downloads).unwrap();
    let source = downloads.join("Game.Title.v1.0.bin");
    std::fs::write(&source, b"payload").unwrap();
    let _worker = pipeline.start_worker();

    let task = pipeline.submit(source.to_str().unwrap()).await.unwrap();
    let task = wait_for_status(&pipeline, task.id, TaskStatus::Completed).await;

    assert_eq!(task.game_name.as_deref(), Some("Game Title"));
    assert_eq!(task.version.as_deref(), Some("1.0"));
    let dest = task.destination.unwrap();
    assert_eq!(dest, pipeline.config.paths.library_dir.join("Game Title").join("1.0"));
    // File sources are placed as-is
    assert!(dest.join("Game.Title.v1.0.bin").exists());
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let iso = Arc::new(
        ScriptedExtractor::new("iso")
            .failing_times(2, "data error")
            .with_file("setup.exe", b"MZ"),
    );
    let (pipeline, _dir) =
        create_test_pipeline_with(Arc::new(ScriptedExtractor::new("rar")), iso.clone()).await;
    let source = make_release(&pipeline, "Some.Game.v1.2.3-CODEX", &[("game.iso", b"iso")]);
    let mut events = pipeline.subscribe();
    let _worker = pipeline.start_worker();

    let task = pipeline.submit(source.to_str().unwrap()).await.unwrap();
    let seen = collect_until(&mut events, |e| matches!(e, Event::Completed { .. })).await;

    assert_eq!(iso.calls().len(), 3);
    assert!(seen.contains(&Event::Retrying {
        id: task.id,
        attempt: 2
    }));
    assert!(seen.contains(&Event::Retrying {
        id: task.id,
        attempt: 3
    }));

    let task = pipeline.get_task(task.id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert!(task.error.is_none());

    let progress = progress_of(&seen, task.id);
    assert!(progress.windows(2).all(|w| w[0] <= w[1]), "{:?}", progress);
}

#[tokio::test]
async fn test_resubmission_during_retry_delay_returns_same_task() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.queue.retry.initial_delay = Duration::from_millis(500);
    config.queue.retry.max_delay = Duration::from_millis(500);
    let iso = Arc::new(
        ScriptedExtractor::new("iso")
            .failing_times(1, "crc error")
            .with_file("setup.exe", b"MZ"),
    );
    let pipeline = build_pipeline(
        config,
        Arc::new(ScriptedExtractor::new("rar")),
        iso.clone(),
        Arc::new(crate::metadata::NoOpMetadataProvider),
    )
    .await;
    let source = make_release(&pipeline, "Some.Game.v1.2.3-CODEX", &[("game.iso", b"iso")]);
    let mut events = pipeline.subscribe();
    let _worker = pipeline.start_worker();

    let first = pipeline.submit(source.to_str().unwrap()).await.unwrap();
    // The first attempt has failed and the worker is waiting to retry
    wait_for_status(&pipeline, first.id, TaskStatus::Failed).await;

    let second = pipeline.submit(source.to_str().unwrap()).await.unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(pipeline.queue_stats().await.pending, 0);

    collect_until(&mut events, |e| matches!(e, Event::Completed { .. })).await;
    let tasks = pipeline.list_tasks(None).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].status, TaskStatus::Completed);
    assert_eq!(iso.calls().len(), 2);
}

#[tokio::test]
async fn test_task_fails_after_three_attempts() {
    let iso = Arc::new(ScriptedExtractor::new("iso").failing_times(10, "data error"));
    let (pipeline, _dir) =
        create_test_pipeline_with(Arc::new(ScriptedExtractor::new("rar")), iso.clone()).await;
    let source = make_release(&pipeline, "Some.Game.v1.2.3-CODEX", &[("game.iso", b"iso")]);
    let mut events = pipeline.subscribe();
    let _worker = pipeline.start_worker();

    let task = pipeline.submit(source.to_str().unwrap()).await.unwrap();
    let seen = collect_until(&mut events, |e| matches!(e, Event::Failed { .. })).await;

    assert_eq!(iso.calls().len(), 3);
    let task = pipeline.get_task(task.id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task.error.as_deref().unwrap().contains("data error"));
    // Progress from the failed attempts is kept
    assert_eq!(task.progress, 20);
    match seen.last().unwrap() {
        Event::Failed { id, error } => {
            assert_eq!(*id, task.id);
            assert!(error.contains("data error"));
        }
        other => panic!("expected Failed, got {:?}", other),
    }

    // A failed path can be submitted again
    let again = pipeline.submit(source.to_str().unwrap()).await.unwrap();
    assert_ne!(again.id, task.id);
}

#[tokio::test]
async fn test_completed_path_is_not_queued_again() {
    let (pipeline, _dir) = create_test_pipeline().await;
    let source = make_release(&pipeline, "Some.Game.v1.2.3-CODEX", &[("a.txt", b"a")]);
    let _worker = pipeline.start_worker();

    let task = pipeline.submit(source.to_str().unwrap()).await.unwrap();
    wait_for_status(&pipeline, task.id, TaskStatus::Completed).await;

    let again = pipeline.submit(source.to_str().unwrap()).await.unwrap();
    assert_eq!(again.id, task.id);
    assert_eq!(again.status, TaskStatus::Completed);
    assert_eq!(pipeline.list_tasks(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_process_completed_task_is_noop() {
    let (pipeline, _dir) = create_test_pipeline().await;
    let source = make_release(&pipeline, "Some.Game.v1.2.3-CODEX", &[("a.txt", b"a")]);
    let task = pipeline.submit(source.to_str().unwrap()).await.unwrap();
    pipeline
        .db
        .update_task_status(task.id, TaskStatus::Completed, None)
        .await
        .unwrap();

    let outcome = pipeline.process_task(task.id).await.unwrap();
    assert_eq!(outcome, ProcessOutcome::AlreadyCompleted);
}

#[tokio::test]
async fn test_process_unknown_task_is_not_found() {
    let (pipeline, _dir) = create_test_pipeline().await;

    let err = pipeline.process_task(TaskId(42)).await.unwrap_err();
    assert!(matches!(err, Error::Task(TaskError::NotFound { id: 42 })));
}

#[tokio::test]
async fn test_source_removed_before_processing_fails_without_retry() {
    let (pipeline, _dir) = create_test_pipeline().await;
    let source = make_release(&pipeline, "Some.Game.v1.2.3-CODEX", &[("a.txt", b"a")]);
    let task = pipeline.submit(source.to_str().unwrap()).await.unwrap();
    std::fs::remove_dir_all(&source).unwrap();

    let err = pipeline.process_task(task.id).await.unwrap_err();
    assert!(matches!(err, Error::PathNotFound { .. }));

    let task = pipeline.get_task(task.id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.progress, 20);
}

#[tokio::test]
async fn test_metadata_match_enriches_game_record() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let metadata = Arc::new(StaticMetadata(vec![GameMetadata {
        name: "Game Title".into(),
        release_date: Some("2020-01-01T00:00:00Z".into()),
        description: Some("A game".into()),
        cover_url: Some("https://images.example/cover.jpg".into()),
        source: "IGDB".into(),
    }]));
    let pipeline = build_pipeline(
        config,
        Arc::new(ScriptedExtractor::new("rar")),
        Arc::new(ScriptedExtractor::new("iso")),
        metadata,
    )
    .await;
    let source = make_release(&pipeline, "Game.Title.v2.0.0-GROUP", &[("a.txt", b"a")]);
    let _worker = pipeline.start_worker();

    let task = pipeline.submit(source.to_str().unwrap()).await.unwrap();
    wait_for_status(&pipeline, task.id, TaskStatus::Completed).await;

    let games = pipeline.list_games().await.unwrap();
    assert_eq!(games.len(), 1);
    assert_eq!(games[0].description.as_deref(), Some("A game"));
    assert_eq!(
        games[0].cover_url.as_deref(),
        Some("https://images.example/cover.jpg")
    );
}

#[tokio::test]
async fn test_metadata_failure_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let pipeline = build_pipeline(
        config,
        Arc::new(ScriptedExtractor::new("rar")),
        Arc::new(ScriptedExtractor::new("iso")),
        Arc::new(BrokenMetadata),
    )
    .await;
    let source = make_release(&pipeline, "Game.Title.v2.0.0-GROUP", &[("a.txt", b"a")]);
    let _worker = pipeline.start_worker();

    let task = pipeline.submit(source.to_str().unwrap()).await.unwrap();
    let task = wait_for_status(&pipeline, task.id, TaskStatus::Completed).await;

    assert_eq!(task.progress, 100);
    let game = pipeline
        .db
        .find_game_by_name("Game Title")
        .await
        .unwrap()
        .unwrap();
    assert!(game.description.is_none());
}

#[tokio::test]
async fn test_search_metadata_rejects_empty_query() {
    let (pipeline, _dir) = create_test_pipeline().await;

    let err = pipeline.search_metadata(" - _ ").await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(pipeline.search_metadata("Game").await.unwrap().is_empty());
}

#[test]
fn test_extraction_progress_mapping() {
    assert_eq!(extraction_to_task_progress(0), 20);
    assert_eq!(extraction_to_task_progress(50), 50);
    assert_eq!(extraction_to_task_progress(35), 41);
    assert_eq!(extraction_to_task_progress(100), 80);
    assert_eq!(extraction_to_task_progress(250), 80);
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_list_tasks_by_status_and_processing_tasks() {
    let (pipeline, _dir) = create_test_pipeline().await;
    let a = make_release(&pipeline, "A.Game.v1-GRP", &[("a.txt", b"a")]);
    let b = make_release(&pipeline, "B.Game.v1-GRP", &[("b.txt", b"b")]);
    let first = pipeline.submit(a.to_str().unwrap()).await.unwrap();
    let second = pipeline.submit(b.to_str().unwrap()).await.unwrap();
    pipeline
        .db
        .update_task_status(first.id, TaskStatus::Processing, None)
        .await
        .unwrap();

    let queued = pipeline.list_tasks(Some(TaskStatus::Queued)).await.unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].id, second.id);

    let processing = pipeline.processing_tasks().await.unwrap();
    assert_eq!(processing.len(), 1);
    assert_eq!(processing[0].id, first.id);

    assert_eq!(pipeline.list_tasks(None).await.unwrap().len(), 2);
    assert_eq!(pipeline.get_progress(TaskId(12345)).await.unwrap(), 0);
}

#[tokio::test]
async fn test_list_tasks_is_newest_first_with_and_without_filter() {
    let (pipeline, _dir) = create_test_pipeline().await;
    let mut ids = Vec::new();
    for name in ["A.Game.v1-GRP", "B.Game.v1-GRP", "C.Game.v1-GRP"] {
        let source = make_release(&pipeline, name, &[("a.txt", b"a")]);
        ids.push(pipeline.submit(source.to_str().unwrap()).await.unwrap().id);
    }
    ids.reverse();

    let all: Vec<TaskId> = pipeline
        .list_tasks(None)
        .await
        .unwrap()
        .iter()
        .map(|t| t.id)
        .collect();
    let queued: Vec<TaskId> = pipeline
        .list_tasks(Some(TaskStatus::Queued))
        .await
        .unwrap()
        .iter()
        .map(|t| t.id)
        .collect();

    assert_eq!(all, ids);
    assert_eq!(queued, ids);
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_startup_recovery() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let (interrupted, waiting) = {
        let db = Database::new(&config.persistence.database_path)
            .await
            .unwrap();
        let interrupted = db
            .insert_task(&config.paths.downloads_dir.join("Interrupted"))
            .await
            .unwrap();
        db.update_task_status(interrupted, TaskStatus::Processing, None)
            .await
            .unwrap();
        let waiting = db
            .insert_task(&config.paths.downloads_dir.join("Waiting"))
            .await
            .unwrap();
        db.update_task_status(waiting, TaskStatus::Queued, None)
            .await
            .unwrap();
        db.close().await;
        (interrupted, waiting)
    };

    let pipeline = build_pipeline(
        config,
        Arc::new(ScriptedExtractor::new("rar")),
        Arc::new(ScriptedExtractor::new("iso")),
        Arc::new(crate::metadata::NoOpMetadataProvider),
    )
    .await;

    let failed = pipeline.get_task(interrupted).await.unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    assert_eq!(failed.error.as_deref(), Some(INTERRUPTED_MESSAGE));

    let stats = pipeline.queue_stats().await;
    assert_eq!(stats.pending, 1);
    assert_eq!(
        pipeline.get_task(waiting).await.unwrap().status,
        TaskStatus::Queued
    );
}

#[tokio::test]
async fn test_shutdown_stops_admission_and_worker() {
    let (pipeline, _dir) = create_test_pipeline().await;
    let source = make_release(&pipeline, "Some.Game.v1.2.3-CODEX", &[("a.txt", b"a")]);
    let mut events = pipeline.subscribe();
    let worker = pipeline.start_worker();

    pipeline.shutdown().await.unwrap();

    assert!(!pipeline.is_accepting());
    let err = pipeline.submit(source.to_str().unwrap()).await.unwrap_err();
    assert!(matches!(err, Error::ShuttingDown));

    tokio::time::timeout(Duration::from_secs(2), worker)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(events.recv().await.unwrap(), Event::Shutdown);
    assert!(!pipeline.queue_stats().await.accepting_new);
}
