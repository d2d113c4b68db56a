//! Library handlers: placed games and metadata search.

use super::SearchRequest;
use crate::api::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// GET /api/games - Placed games
#[utoipa::path(
    get,
    path = "/api/games",
    tag = "library",
    responses(
        (status = 200, description = "Games placed into the library, sorted by name", body = Vec<crate::db::Game>),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn list_games(State(state): State<AppState>) -> Response {
    match state.pipeline.list_games().await {
        Ok(games) => (StatusCode::OK, Json(games)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/search - Search the metadata catalog
#[utoipa::path(
    post,
    path = "/api/search",
    tag = "library",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Candidate matches, best first", body = Vec<crate::metadata::GameMetadata>),
        (status = 400, description = "Empty query", body = crate::error::ApiError)
    )
)]
pub async fn search_metadata(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Response {
    match state.pipeline.search_metadata(&request.query).await {
        Ok(results) => (StatusCode::OK, Json(results)).into_response(),
        Err(e) => e.into_response(),
    }
}
