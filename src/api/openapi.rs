//! OpenAPI documentation and schema generation
//!
//! The OpenAPI document is generated at compile time with utoipa.

use utoipa::OpenApi;

/// OpenAPI documentation for the game-ingest REST API
///
/// The document is served at:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation (when enabled)
#[derive(OpenApi)]
#[openapi(
    info(
        title = "game-ingest REST API",
        version = "0.1.0",
        description = "Submit downloaded game releases for extraction and placement into the game library",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        // Tasks
        crate::api::routes::process_path,
        crate::api::routes::list_tasks,
        crate::api::routes::get_task,
        crate::api::routes::get_task_progress,
        crate::api::routes::cancel_task,
        crate::api::routes::queue_stats,

        // Library
        crate::api::routes::list_games,
        crate::api::routes::search_metadata,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        crate::types::TaskId,
        crate::types::TaskStatus,
        crate::types::Stage,
        crate::types::Event,
        crate::types::TaskInfo,
        crate::types::QueueStats,
        crate::db::Game,
        crate::metadata::GameMetadata,

        crate::config::Config,
        crate::config::PathsConfig,
        crate::config::QueueConfig,
        crate::config::RetryConfig,
        crate::config::ToolsConfig,
        crate::config::MetadataConfig,
        crate::config::PersistenceConfig,
        crate::config::ApiConfig,

        crate::api::routes::ProcessRequest,
        crate::api::routes::TaskListQuery,
        crate::api::routes::TaskProgress,
        crate::api::routes::SearchRequest,

        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "tasks", description = "Ingestion tasks - Submit paths, follow progress, cancel"),
        (name = "library", description = "Game library - Placed games and metadata search"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events"),
    )
)]
pub struct ApiDoc;
