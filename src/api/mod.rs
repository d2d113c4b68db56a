//! REST API server module
//!
//! Provides an OpenAPI 3.1 compliant REST API for submitting release
//! directories, monitoring tasks and browsing placed games.

use crate::{Config, Pipeline, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Tasks
/// - `POST /api/process` - Submit a path for ingestion
/// - `GET /api/tasks` - List tasks (optionally `?status=`)
/// - `GET /api/tasks/:id` - Get single task
/// - `GET /api/tasks/:id/progress` - Get task progress
/// - `POST /api/tasks/:id/cancel` - Cancel a task
/// - `GET /api/queue` - Work queue statistics
///
/// ## Library
/// - `GET /api/games` - Placed games
/// - `POST /api/search` - Metadata catalog search
///
/// ## System
/// - `GET /api/events` - Server-sent events stream
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
pub fn create_router(pipeline: Arc<Pipeline>, config: Arc<Config>) -> Router {
    let state = AppState::new(pipeline, config.clone());

    let router = Router::new()
        // Tasks
        .route("/api/process", post(routes::process_path))
        .route("/api/tasks", get(routes::list_tasks))
        .route("/api/tasks/:id", get(routes::get_task))
        .route("/api/tasks/:id/progress", get(routes::get_task_progress))
        .route("/api/tasks/:id/cancel", post(routes::cancel_task))
        .route("/api/queue", get(routes::queue_stats))
        // Library
        .route("/api/games", get(routes::list_games))
        .route("/api/search", post(routes::search_metadata))
        // System
        .route("/api/events", get(routes::event_stream))
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec));

    // Merge Swagger UI routes if enabled in config (before applying state)
    let router = if config.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state).layer(TraceLayer::new_for_http());

    // Apply CORS middleware if enabled in config
    if config.api.cors_enabled {
        let cors = build_cors_layer(&config.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the server stops, either due to an error or because the
/// returned future is dropped.
///
/// # Example
///
/// ```no_run
/// use game_ingest::{Config, Pipeline};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let pipeline = Arc::new(Pipeline::new((*config).clone()).await?);
///
/// // Start API server (blocks until shutdown)
/// game_ingest::api::start_api_server(pipeline, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(pipeline: Arc<Pipeline>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(pipeline, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}
