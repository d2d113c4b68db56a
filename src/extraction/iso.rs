//! ISO extraction through the `7z` command line tool

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

use super::progress::IsoProgress;
use super::shared::{resolve_binary, run_tool};
use super::traits::{Extractor, ProgressFn};
use crate::config::ToolsConfig;

/// ISO extractor backed by an external 7-Zip binary
///
/// Runs `7z x <image> -o<dest> -y -bsp1` so progress is printed to stdout.
pub struct CliIsoExtractor {
    binary_path: PathBuf,
}

impl CliIsoExtractor {
    /// Create an extractor with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find `7z` (or `7za`) in PATH
    pub fn from_path() -> Option<Self> {
        ["7z", "7za"]
            .iter()
            .find_map(|name| which::which(name).ok())
            .map(Self::new)
    }

    /// Build from tool configuration, falling back to a PATH lookup
    pub fn from_config(tools: &ToolsConfig) -> Self {
        Self::new(resolve_binary(
            tools.sevenzip_path.as_deref(),
            tools.search_path,
            &["7z", "7za"],
        ))
    }

    /// Binary this extractor runs
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }
}

#[async_trait]
impl Extractor for CliIsoExtractor {
    async fn extract(
        &self,
        archive: &Path,
        dest: &Path,
        on_progress: ProgressFn<'_>,
    ) -> crate::Result<()> {
        tokio::fs::create_dir_all(dest).await?;
        info!(?archive, ?dest, "extracting ISO image");

        let mut out_arg = std::ffi::OsString::from("-o");
        out_arg.push(dest.as_os_str());

        let mut command = Command::new(&self.binary_path);
        command
            .arg("x")
            .arg(archive)
            .arg(out_arg)
            .arg("-y")
            .arg("-bsp1");

        let mut progress = IsoProgress::new();
        run_tool("7z", command, archive, |segment| {
            if let Some(value) = progress.feed(segment) {
                debug!(progress = value, "ISO extraction progress");
                on_progress(value);
            }
        })
        .await?;

        info!(?archive, "ISO extraction completed successfully");
        on_progress(100);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "cli-7z"
    }
}
