//! Error types for game-ingest
//!
//! This module provides the error handling for the library, including:
//! - Domain-specific error types (Task, Extraction, Placement, Database)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for game-ingest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for game-ingest
///
/// Each variant includes contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "DOWNLOADS_DIR")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Task-related error
    #[error("task error: {0}")]
    Task(#[from] TaskError),

    /// Submitted path does not exist on disk
    #[error("path does not exist: {}", path.display())]
    PathNotFound {
        /// The normalized path that was checked
        path: PathBuf,
    },

    /// Request input was rejected before any work happened
    #[error("validation error: {0}")]
    Validation(String),

    /// Archive extraction error
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// File placement error
    #[error("placement error: {0}")]
    Placement(#[from] PlacementError),

    /// Metadata catalog lookup failed
    #[error("metadata lookup failed: {0}")]
    Metadata(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Shutdown in progress - not accepting new paths
    #[error("shutdown in progress: not accepting new tasks")]
    ShuttingDown,

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Task-related errors
#[derive(Debug, Error)]
pub enum TaskError {
    /// Task not found in the task store
    #[error("task {id} not found")]
    NotFound {
        /// The task ID that was not found
        id: i64,
    },

    /// Cannot perform operation in current state
    #[error("cannot {operation} task {id} in state {current_state}")]
    InvalidState {
        /// The task ID that is in an invalid state for the operation
        id: i64,
        /// The operation that was attempted (e.g., "cancel", "process")
        operation: String,
        /// The current state that prevents the operation (e.g., "completed")
        current_state: String,
    },
}

/// Archive extraction errors
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// External archive tool exited with a non-zero status
    #[error("{tool} failed for {}: {reason}", archive.display())]
    ToolFailed {
        /// Tool name (unrar, 7z)
        tool: String,
        /// The archive being extracted
        archive: PathBuf,
        /// Exit status and captured diagnostics
        reason: String,
    },

    /// External archive tool could not be located or started
    #[error("{tool} is not available: {reason}")]
    ToolUnavailable {
        /// Tool name (unrar, 7z)
        tool: String,
        /// Why the tool could not be run
        reason: String,
    },
}

/// File placement errors
#[derive(Debug, Error)]
pub enum PlacementError {
    /// Copying extracted content into the library failed
    #[error("failed to copy {} to {}: {reason}", source_path.display(), dest_path.display())]
    CopyFailed {
        /// The file being copied
        source_path: PathBuf,
        /// The destination it was being copied to
        dest_path: PathBuf,
        /// The underlying I/O failure
        reason: String,
    },

    /// Workspace removal failed (non-fatal, logged as warning)
    #[error("cleanup failed for {}: {reason}", path.display())]
    CleanupFailed {
        /// The directory that could not be removed
        path: PathBuf,
        /// The reason removal failed
        reason: String,
    },
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "task_not_found",
///     "message": "task error: task 123 not found",
///     "details": {
///       "task_id": 123
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::Validation(_) => 400,

            // 404 Not Found
            Error::PathNotFound { .. } => 404,
            Error::Task(TaskError::NotFound { .. }) => 404,

            // 409 Conflict - Operation not allowed in current state
            Error::Task(TaskError::InvalidState { .. }) => 409,

            // 422 Unprocessable Entity - Pipeline failures on valid input
            Error::Extraction(ExtractionError::ToolFailed { .. }) => 422,
            Error::Placement(_) => 422,

            // 500 Internal Server Error - Server-side issues
            Error::Database(_) => 500,
            Error::Sqlx(_) => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Serialization(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - External service errors
            Error::Metadata(_) => 502,
            Error::Network(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
            Error::Extraction(ExtractionError::ToolUnavailable { .. }) => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Database(_) => "database_error",
            Error::Sqlx(_) => "database_error",
            Error::Task(e) => match e {
                TaskError::NotFound { .. } => "task_not_found",
                TaskError::InvalidState { .. } => "invalid_state",
            },
            Error::PathNotFound { .. } => "path_not_found",
            Error::Validation(_) => "validation_error",
            Error::Extraction(e) => match e {
                ExtractionError::ToolFailed { .. } => "archive_tool_failure",
                ExtractionError::ToolUnavailable { .. } => "archive_tool_unavailable",
            },
            Error::Placement(e) => match e {
                PlacementError::CopyFailed { .. } => "placement_failure",
                PlacementError::CleanupFailed { .. } => "cleanup_failed",
            },
            Error::Metadata(_) => "metadata_error",
            Error::Io(_) => "io_error",
            Error::ShuttingDown => "shutting_down",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        // Add contextual details for specific error types
        let details = match &error {
            Error::Task(TaskError::NotFound { id }) => Some(serde_json::json!({
                "task_id": id,
            })),
            Error::Task(TaskError::InvalidState {
                id,
                operation,
                current_state,
            }) => Some(serde_json::json!({
                "task_id": id,
                "operation": operation,
                "current_state": current_state,
            })),
            Error::PathNotFound { path } => Some(serde_json::json!({
                "path": path,
            })),
            Error::Extraction(ExtractionError::ToolFailed { tool, archive, .. }) => {
                Some(serde_json::json!({
                    "tool": tool,
                    "archive": archive,
                }))
            }
            Error::Placement(PlacementError::CopyFailed {
                source_path,
                dest_path,
                ..
            }) => Some(serde_json::json!({
                "source_path": source_path,
                "dest_path": dest_path,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
