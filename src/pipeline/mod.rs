//! Ingestion pipeline split into focused submodules.
//!
//! The [`Pipeline`] struct and its methods are organized by domain:
//! - [`admission`] - Path submission, dedup and cancellation
//! - [`queue`] - Single-worker FIFO queue
//! - [`worker`] - Queue worker with whole-run retry
//! - [`processor`] - Per-task stage machine (naming to cleanup)
//! - [`lifecycle`] - Startup recovery and graceful shutdown
//! - [`queries`] - Read-only task, game and metadata lookups

mod admission;
mod lifecycle;
mod processor;
mod queries;
mod queue;
mod worker;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use lifecycle::INTERRUPTED_MESSAGE;
pub use processor::{ProcessOutcome, extraction_to_task_progress};

use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::extraction::ExtractionEngine;
use crate::metadata::{CatalogMetadataProvider, MetadataProvider, NoOpMetadataProvider};
use crate::types::Event;
use admission::SeenPaths;
use queue::WorkQueue;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Admission state (seen paths, lock, accepting flag)
#[derive(Clone)]
pub(crate) struct AdmissionState {
    /// Paths admitted by this process, mapped to their task
    pub(crate) seen: SeenPaths,
    /// Serializes the check-then-insert sequence of concurrent submissions
    pub(crate) lock: Arc<tokio::sync::Mutex<()>>,
    /// Flag to indicate whether new paths are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
}

impl AdmissionState {
    fn new() -> Self {
        Self {
            seen: SeenPaths::default(),
            lock: Arc::new(tokio::sync::Mutex::new(())),
            accepting_new: Arc::new(AtomicBool::new(true)),
        }
    }
}

/// Main pipeline instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct Pipeline {
    /// Task store (public for integration tests to query task status)
    pub db: Arc<Database>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// FIFO work queue drained by the single worker
    pub(crate) queue: WorkQueue,
    /// Admission state
    pub(crate) admission: AdmissionState,
    /// RAR/ISO extraction
    pub(crate) extraction: ExtractionEngine,
    /// Catalog used to enrich game records
    pub(crate) metadata: Arc<dyn MetadataProvider>,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    ///
    /// This will:
    /// 1. Create the library, temp and extraction directories
    /// 2. Open (and migrate) the SQLite task store
    /// 3. Locate `unrar` and `7z`
    /// 4. Pick the catalog metadata provider when credentials are configured
    /// 5. Recover tasks left behind by a previous process
    pub async fn new(config: Config) -> Result<Self> {
        for dir in [
            &config.paths.library_dir,
            &config.paths.temp_dir,
            &config.paths.extract_dir,
        ] {
            tokio::fs::create_dir_all(dir).await?;
        }

        let db = Database::new(&config.persistence.database_path).await?;
        let extraction = ExtractionEngine::from_config(&config.tools);

        let metadata: Arc<dyn MetadataProvider> = if config.metadata.has_credentials() {
            Arc::new(CatalogMetadataProvider::new(config.metadata.clone())?)
        } else {
            tracing::info!("no metadata credentials configured, skipping catalog lookups");
            Arc::new(NoOpMetadataProvider)
        };

        Self::with_components(config, db, extraction, metadata).await
    }

    /// Create a pipeline from already-built components
    ///
    /// Runs startup recovery like [`Pipeline::new`]; directories are not created.
    pub async fn with_components(
        config: Config,
        db: Database,
        extraction: ExtractionEngine,
        metadata: Arc<dyn MetadataProvider>,
    ) -> Result<Self> {
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        let pipeline = Self {
            db: Arc::new(db),
            event_tx,
            config: Arc::new(config),
            queue: WorkQueue::default(),
            admission: AdmissionState::new(),
            extraction,
            metadata,
        };

        pipeline.recover_tasks().await?;

        Ok(pipeline)
    }

    /// Subscribe to pipeline events
    ///
    /// Returns a receiver that will receive all events emitted by the pipeline.
    /// Multiple subscribers are supported; a slow subscriber misses events
    /// instead of blocking the worker.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use game_ingest::{Config, Pipeline};
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let pipeline = Pipeline::new(Config::default()).await?;
    /// let mut events = pipeline.subscribe();
    ///
    /// tokio::spawn(async move {
    ///     while let Ok(event) = events.recv().await {
    ///         println!("Event: {:?}", event);
    ///     }
    /// });
    /// # Ok(())
    /// # }
    /// ```
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Emit an event; having no subscribers is fine
    pub(crate) fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Spawn the REST API server in a background task
    ///
    /// Listens on the configured bind address (default: 127.0.0.1:3000).
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let pipeline = Arc::clone(self);
        let config = self.get_config();

        tokio::spawn(async move { crate::api::start_api_server(pipeline, config).await })
    }
}
