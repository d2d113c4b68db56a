//! Archive extraction for game releases
//!
//! The [`ExtractionEngine`] looks at a downloaded release directory, extracts
//! the root volume of a RAR set and any ISO images that come out of it, or a
//! bare ISO image, and reports one weighted 0-100 progress figure for the
//! whole stage. The external tools sit behind the [`Extractor`] trait.

mod iso;
mod progress;
mod rar;
mod shared;
mod traits;
pub mod volumes;


// Re-exports
pub use iso::CliIsoExtractor;
pub use progress::{
    ISO_STAGE_WEIGHT, IsoProgress, MonotonicReporter, RAR_STAGE_WEIGHT, RarProgress,
    SegmentSplitter, iso_stage_progress, rar_stage_progress,
};
pub use rar::CliRarExtractor;
pub use shared::{ArchiveScan, scan_archives};
pub use traits::{Extractor, ProgressFn};

use crate::config::ToolsConfig;
use crate::error::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Orchestrates RAR and ISO extraction for one release directory
#[derive(Clone)]
pub struct ExtractionEngine {
    rar: Arc<dyn Extractor>,
    iso: Arc<dyn Extractor>,
}

impl ExtractionEngine {
    /// Create an engine from explicit extractor implementations
    pub fn new(rar: Arc<dyn Extractor>, iso: Arc<dyn Extractor>) -> Self {
        Self { rar, iso }
    }

    /// Create an engine that shells out to `unrar` and `7z`
    pub fn from_config(tools: &ToolsConfig) -> Self {
        let rar = CliRarExtractor::from_config(tools);
        let iso = CliIsoExtractor::from_config(tools);
        info!(
            unrar = ?rar.binary_path(),
            sevenzip = ?iso.binary_path(),
            "archive tools configured"
        );
        Self::new(Arc::new(rar), Arc::new(iso))
    }

    /// Extract whatever archive group `source` holds into `dest`
    ///
    /// - A RAR set is extracted from its root volume; ISO images that come out
    ///   of it are extracted to `dest/<image stem>` and then deleted. RAR maps
    ///   to 0-70 of the reported progress and the nested images share 70-100.
    /// - Without a usable RAR set, the first ISO in `source` is extracted
    ///   straight into `dest` and its own progress is reported unweighted.
    ///
    /// `on_progress` only ever sees strictly increasing values and receives
    /// 100 when the stage finishes. Returns `false` when nothing was extracted.
    pub async fn extract_archives(
        &self,
        source: &Path,
        dest: &Path,
        on_progress: ProgressFn<'_>,
    ) -> Result<bool> {
        info!(?source, "looking for archives");
        let scan = scan_archives(source).await?;

        if scan.is_empty() {
            info!(?source, "no archive files found to extract");
            return Ok(false);
        }

        tokio::fs::create_dir_all(dest).await?;
        let reporter = MonotonicReporter::new(on_progress);

        if !scan.rars.is_empty() {
            match volumes::find_root_volume(&scan.rar_names()) {
                Some(root) => {
                    let root = source.join(root);
                    self.rar
                        .extract(&root, dest, &|p| reporter.report(rar_stage_progress(p)))
                        .await?;

                    self.extract_nested_isos(dest, &reporter).await?;
                    reporter.report(100);
                    return Ok(true);
                }
                None => {
                    warn!(
                        ?source,
                        rars = scan.rars.len(),
                        "no root RAR volume found, skipping RAR extraction"
                    );
                }
            }
        }

        if let Some(image) = scan.isos.first() {
            self.iso
                .extract(image, dest, &|p| reporter.report(p))
                .await?;
            reporter.report(100);
            return Ok(true);
        }

        Ok(false)
    }

    async fn extract_nested_isos(
        &self,
        dest: &Path,
        reporter: &MonotonicReporter<'_>,
    ) -> Result<()> {
        let nested = scan_archives(dest).await?.isos;
        if nested.is_empty() {
            return Ok(());
        }

        info!(count = nested.len(), "found nested ISO image(s)");
        let count = nested.len();

        for (index, image) in nested.iter().enumerate() {
            let stem = image
                .file_stem()
                .map(|s| s.to_os_string())
                .unwrap_or_else(|| "image".into());
            let target = dest.join(stem);

            self.iso
                .extract(image, &target, &|p| {
                    reporter.report(iso_stage_progress(p, index, count))
                })
                .await?;

            if let Err(e) = tokio::fs::remove_file(image).await {
                warn!(?image, error = %e, "failed to remove ISO image after extraction");
            }
        }

        Ok(())
    }
}
