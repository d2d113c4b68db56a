//! Database layer for game-ingest
//!
//! Handles SQLite persistence for ingestion tasks and placed games.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`tasks`] - Task store (status, progress, errors, placement results)
//! - [`games`] - Placed game records

use crate::types::{TaskId, TaskInfo, TaskStatus};
use chrono::{DateTime, TimeZone, Utc};
use sqlx::{FromRow, sqlite::SqlitePool};
use std::path::PathBuf;

mod games;
mod migrations;
mod tasks;

/// Task record from database
#[derive(Debug, Clone, FromRow)]
pub struct Task {
    /// Unique database ID
    pub id: i64,
    /// Normalized absolute source path
    pub path: String,
    /// Lowercase status text (see [`TaskStatus::as_str`])
    pub status: String,
    /// Progress percentage (0-100)
    pub progress: i64,
    /// Error message if the task failed
    pub error: Option<String>,
    /// Game name derived during processing
    pub game_name: Option<String>,
    /// Version derived during processing
    pub version: Option<String>,
    /// Library directory the content was placed into
    pub destination_path: Option<String>,
    /// Unix timestamp when the task was created
    pub created_at: i64,
    /// Unix timestamp of the last status or progress change
    pub updated_at: i64,
}

impl Task {
    /// Parsed status
    pub fn status(&self) -> TaskStatus {
        TaskStatus::from_db(&self.status)
    }

    /// Typed identifier
    pub fn task_id(&self) -> TaskId {
        TaskId(self.id)
    }
}

impl From<Task> for TaskInfo {
    fn from(row: Task) -> Self {
        TaskInfo {
            id: TaskId(row.id),
            status: TaskStatus::from_db(&row.status),
            path: PathBuf::from(row.path),
            progress: row.progress.clamp(0, 100) as u8,
            error: row.error,
            game_name: row.game_name,
            version: row.version,
            destination: row.destination_path.map(PathBuf::from),
            created_at: timestamp(row.created_at),
            updated_at: timestamp(row.updated_at),
        }
    }
}

/// Game record to upsert after a successful placement
#[derive(Debug, Clone)]
pub struct NewGame {
    /// Cleaned game name (unique key)
    pub name: String,
    /// Version that was just placed
    pub version: String,
    /// Release date from the metadata catalog
    pub release_date: Option<String>,
    /// Short description from the metadata catalog
    pub description: Option<String>,
    /// Cover art URL from the metadata catalog
    pub cover_url: Option<String>,
    /// Library directory holding the placed version
    pub destination_path: String,
}

/// Game record from database
#[derive(Debug, Clone, FromRow, serde::Serialize, utoipa::ToSchema)]
pub struct Game {
    /// Unique database ID
    pub id: i64,
    /// Cleaned game name
    pub name: String,
    /// Most recently placed version
    pub latest_version: Option<String>,
    /// Release date from the metadata catalog
    pub release_date: Option<String>,
    /// Short description from the metadata catalog
    pub description: Option<String>,
    /// Cover art URL from the metadata catalog
    pub cover_url: Option<String>,
    /// Library directory holding the most recent version
    pub destination_path: Option<String>,
    /// Record status (`downloaded` once placed)
    pub status: String,
    /// Unix timestamp when the game was first placed
    pub created_at: i64,
    /// Unix timestamp of the last placement
    pub updated_at: i64,
}

/// Database handle for game-ingest
pub struct Database {
    pool: SqlitePool,
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now)
}
