//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`tasks`] - Submission, task status, cancellation, queue stats
//! - [`library`] - Placed games and metadata search
//! - [`system`] - Health, events, OpenAPI

use crate::types::TaskId;
use serde::{Deserialize, Serialize};

mod library;
mod system;
mod tasks;

// Re-export all handlers so `routes::function_name` works
pub use library::*;
pub use system::*;
pub use tasks::*;

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Request body for POST /api/process
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ProcessRequest {
    /// Absolute path, or a path relative to the downloads root
    pub path: String,
}

/// Query parameters for GET /api/tasks
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct TaskListQuery {
    /// Only return tasks in this status (`new`, `queued`, `processing`,
    /// `completed`, `failed`, `cancelled`)
    pub status: Option<String>,
}

/// Response for GET /api/tasks/:id/progress
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, utoipa::ToSchema)]
pub struct TaskProgress {
    /// Task ID
    pub id: TaskId,
    /// Progress percentage (0 for an unknown task)
    pub progress: u8,
}

/// Request body for POST /api/search
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SearchRequest {
    /// Game name to look up
    pub query: String,
}
