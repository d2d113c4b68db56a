//! Extractor capability interface

use async_trait::async_trait;
use std::path::Path;

/// Progress callback handed to extractors, called with 0-100
pub type ProgressFn<'a> = &'a (dyn Fn(u8) + Send + Sync);

/// Extracts one archive into a destination directory
///
/// Implementations report their own 0-100 progress through `on_progress`,
/// in non-decreasing order, and report 100 once extraction has succeeded.
/// Stage weighting is applied by the caller.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract `archive` into `dest`, creating `dest` if needed
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ExtractionError::ToolFailed`] when the
    /// underlying tool exits unsuccessfully and
    /// [`crate::error::ExtractionError::ToolUnavailable`] when it cannot be
    /// started.
    async fn extract(
        &self,
        archive: &Path,
        dest: &Path,
        on_progress: ProgressFn<'_>,
    ) -> crate::Result<()>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
