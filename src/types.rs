//! Core types for game-ingest

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;

/// Unique identifier for an ingestion task
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl TaskId {
    /// Create a new TaskId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for TaskId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<TaskId> for i64 {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

// Implement sqlx Type, Encode, and Decode for database operations
impl sqlx::Type<sqlx::Sqlite> for TaskId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for TaskId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for TaskId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let id = <i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(id))
    }
}

/// Task lifecycle status
///
/// Stored as lowercase text in the `tasks.status` column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Created by admission, not yet pushed to the work queue
    New,
    /// Waiting in the work queue
    Queued,
    /// Picked up by the worker
    Processing,
    /// Placed into the library
    Completed,
    /// Failed with an error message
    Failed,
    /// Cancelled by the user
    Cancelled,
}

impl TaskStatus {
    /// All statuses, in lifecycle order
    pub const ALL: [TaskStatus; 6] = [
        TaskStatus::New,
        TaskStatus::Queued,
        TaskStatus::Processing,
        TaskStatus::Completed,
        TaskStatus::Failed,
        TaskStatus::Cancelled,
    ];

    /// The text stored in the database and used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::New => "new",
            TaskStatus::Queued => "queued",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Parse a stored status, falling back to `Failed` for unknown text
    pub fn from_db(status: &str) -> Self {
        status.parse().unwrap_or(TaskStatus::Failed)
    }

    /// Whether the task occupies its path for dedup purposes
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::Queued | TaskStatus::Processing)
    }

    /// Whether cancellation is still allowed from this status
    pub fn is_cancellable(&self) -> bool {
        !matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown task status '{}'", s))
    }
}

/// Processing stage inside a `processing` task
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Deriving game name and version from the folder name
    Naming,
    /// Looking up catalog metadata
    Metadata,
    /// Extracting archives into the workspace
    Extracting,
    /// Copying content into the library
    Placing,
    /// Removing the workspace
    Cleanup,
}

impl Stage {
    /// Progress value written once the stage has finished
    pub fn checkpoint(&self) -> u8 {
        match self {
            Stage::Naming => 10,
            Stage::Metadata => 20,
            Stage::Extracting => 80,
            Stage::Placing => 90,
            Stage::Cleanup => 100,
        }
    }
}

/// Event emitted during the task lifecycle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Task admitted and pushed to the work queue
    Queued {
        /// Task ID
        id: TaskId,
        /// Normalized source path
        path: PathBuf,
    },

    /// Worker picked the task up
    Started {
        /// Task ID
        id: TaskId,
    },

    /// Processor entered a new stage
    Stage {
        /// Task ID
        id: TaskId,
        /// Stage being entered
        stage: Stage,
    },

    /// Task progress changed
    Progress {
        /// Task ID
        id: TaskId,
        /// Overall progress (0 to 100)
        progress: u8,
    },

    /// Task placed into the library
    Completed {
        /// Task ID
        id: TaskId,
        /// Final library directory
        destination: PathBuf,
    },

    /// Processing attempt failed
    Failed {
        /// Task ID
        id: TaskId,
        /// Error message
        error: String,
    },

    /// Work queue is about to re-run a failed task
    Retrying {
        /// Task ID
        id: TaskId,
        /// Attempt number about to start (2 for the first retry)
        attempt: u32,
    },

    /// Task was cancelled
    Cancelled {
        /// Task ID
        id: TaskId,
    },

    /// Graceful shutdown initiated
    Shutdown,
}

/// Public view of a task record
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskInfo {
    /// Unique task identifier
    pub id: TaskId,

    /// Normalized absolute source path
    pub path: PathBuf,

    /// Current status
    pub status: TaskStatus,

    /// Progress percentage (0 to 100)
    pub progress: u8,

    /// Failure message (set only when failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Game name derived from the folder name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_name: Option<String>,

    /// Version token derived from the folder name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Library directory the content was placed into
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<PathBuf>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task last changed status or progress
    pub updated_at: DateTime<Utc>,
}

/// Work queue statistics
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct QueueStats {
    /// Pending plus running
    pub total: usize,

    /// Tasks currently being processed (0 or 1)
    pub running: usize,

    /// Tasks waiting in the queue
    pub pending: usize,

    /// Whether admission is accepting new paths
    pub accepting_new: bool,
}
