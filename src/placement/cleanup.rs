//! Workspace removal

use crate::error::PlacementError;
use std::path::Path;
use tracing::{debug, warn};

/// Remove a temporary directory tree
///
/// A missing directory counts as removed. Any other failure is logged as a
/// [`PlacementError::CleanupFailed`] warning and otherwise ignored; the
/// return value says whether the tree is gone.
pub async fn remove_workspace(path: &Path) -> bool {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => {
            debug!(?path, "removed workspace");
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => {
            let warning = PlacementError::CleanupFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            };
            warn!(error = %warning, "failed to remove workspace");
            false
        }
    }
}
