//! RAR extraction through the `unrar` command line tool

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

use super::progress::RarProgress;
use super::shared::{file_name, list_file_names, resolve_binary, run_tool};
use super::traits::{Extractor, ProgressFn};
use super::volumes::count_volumes;
use crate::config::ToolsConfig;

/// RAR extractor backed by an external `unrar` binary
///
/// Runs `unrar x -o+ -y <archive> <dest>/`, which walks every volume of the
/// set, and turns its per-volume percentages into one overall figure.
pub struct CliRarExtractor {
    binary_path: PathBuf,
}

impl CliRarExtractor {
    /// Create an extractor with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find `unrar` in PATH
    pub fn from_path() -> Option<Self> {
        which::which("unrar").ok().map(Self::new)
    }

    /// Build from tool configuration, falling back to a PATH lookup
    pub fn from_config(tools: &ToolsConfig) -> Self {
        Self::new(resolve_binary(
            tools.unrar_path.as_deref(),
            tools.search_path,
            &["unrar"],
        ))
    }

    /// Binary this extractor runs
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }
}

#[async_trait]
impl Extractor for CliRarExtractor {
    async fn extract(
        &self,
        archive: &Path,
        dest: &Path,
        on_progress: ProgressFn<'_>,
    ) -> crate::Result<()> {
        tokio::fs::create_dir_all(dest).await?;

        let total_volumes = match (archive.parent(), file_name(archive)) {
            (Some(dir), Some(root)) => count_volumes(&root, &list_file_names(dir).await?),
            _ => 1,
        };
        info!(?archive, total_volumes, "extracting RAR archive");

        // Trailing separator tells unrar the destination is a directory
        let mut dest_arg = dest.as_os_str().to_os_string();
        dest_arg.push(std::path::MAIN_SEPARATOR_STR);

        let mut command = Command::new(&self.binary_path);
        command
            .arg("x")
            .arg("-o+")
            .arg("-y")
            .arg(archive)
            .arg(dest_arg);

        let mut progress = RarProgress::new(total_volumes);
        run_tool("unrar", command, archive, |segment| {
            if let Some(value) = progress.feed(segment) {
                debug!(
                    progress = value,
                    volume = progress.current_volume(),
                    total_volumes,
                    "RAR extraction progress"
                );
                on_progress(value);
            }
        })
        .await?;

        info!(?archive, "RAR extraction completed successfully");
        on_progress(100);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "cli-unrar"
    }
}
