//! game-ingest service: worker, REST API and graceful shutdown.

use game_ingest::{Config, Pipeline, run_with_shutdown};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env()?;
    tracing::info!(
        downloads = %config.paths.downloads_dir.display(),
        library = %config.paths.library_dir.display(),
        "Starting game-ingest"
    );

    let pipeline = Pipeline::new(config).await?;
    let worker = pipeline.start_worker();

    let api = Arc::new(pipeline.clone()).spawn_api_server();

    run_with_shutdown(pipeline).await?;

    if let Err(e) = worker.await {
        tracing::warn!(error = %e, "Worker task ended abnormally");
    }
    api.abort();

    tracing::info!("game-ingest stopped");
    Ok(())
}

/// `RUST_LOG` wins; otherwise `LOG_LEVEL`, then `info`.
fn init_tracing() {
    let default_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
