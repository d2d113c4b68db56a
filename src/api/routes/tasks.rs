//! Task submission and status handlers.

use super::{ProcessRequest, TaskListQuery, TaskProgress};
use crate::api::AppState;
use crate::error::Error;
use crate::types::{TaskId, TaskStatus};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// POST /api/process - Submit a path for ingestion
#[utoipa::path(
    post,
    path = "/api/process",
    tag = "tasks",
    request_body = ProcessRequest,
    responses(
        (status = 202, description = "Task queued, or the existing task for this path", body = crate::types::TaskInfo),
        (status = 400, description = "Empty path", body = crate::error::ApiError),
        (status = 404, description = "Path does not exist", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn process_path(
    State(state): State<AppState>,
    Json(request): Json<ProcessRequest>,
) -> Response {
    match state.pipeline.submit(&request.path).await {
        Ok(task) => (StatusCode::ACCEPTED, Json(task)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/tasks - List tasks
#[utoipa::path(
    get,
    path = "/api/tasks",
    tag = "tasks",
    params(
        ("status" = Option<String>, Query, description = "Only return tasks in this status")
    ),
    responses(
        (status = 200, description = "Tasks, newest first", body = Vec<crate::types::TaskInfo>),
        (status = 400, description = "Unknown status", body = crate::error::ApiError)
    )
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<TaskListQuery>,
) -> Response {
    let status = match query.status.as_deref() {
        Some(raw) => match raw.parse::<TaskStatus>() {
            Ok(status) => Some(status),
            Err(message) => return Error::Validation(message).into_response(),
        },
        None => None,
    };

    match state.pipeline.list_tasks(status).await {
        Ok(tasks) => (StatusCode::OK, Json(tasks)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/tasks/:id - Get a task
#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    tag = "tasks",
    params(
        ("id" = i64, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task record", body = crate::types::TaskInfo),
        (status = 404, description = "Task not found", body = crate::error::ApiError)
    )
)]
pub async fn get_task(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.pipeline.get_task(TaskId(id)).await {
        Ok(task) => (StatusCode::OK, Json(task)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/tasks/:id/progress - Get task progress
#[utoipa::path(
    get,
    path = "/api/tasks/{id}/progress",
    tag = "tasks",
    params(
        ("id" = i64, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Current progress (0 for an unknown task)", body = TaskProgress)
    )
)]
pub async fn get_task_progress(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let id = TaskId(id);
    match state.pipeline.get_progress(id).await {
        Ok(progress) => (StatusCode::OK, Json(TaskProgress { id, progress })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/tasks/:id/cancel - Cancel a task
#[utoipa::path(
    post,
    path = "/api/tasks/{id}/cancel",
    tag = "tasks",
    params(
        ("id" = i64, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task cancelled", body = crate::types::TaskInfo),
        (status = 404, description = "Task not found", body = crate::error::ApiError),
        (status = 409, description = "Task already completed or failed", body = crate::error::ApiError)
    )
)]
pub async fn cancel_task(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.pipeline.cancel(TaskId(id)).await {
        Ok(task) => (StatusCode::OK, Json(task)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/queue - Work queue statistics
#[utoipa::path(
    get,
    path = "/api/queue",
    tag = "tasks",
    responses(
        (status = 200, description = "Queue statistics", body = crate::types::QueueStats)
    )
)]
pub async fn queue_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.pipeline.queue_stats().await)
}
