//! Helpers shared by the CLI extractors

use crate::error::{Error, ExtractionError, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, error, warn};

use super::progress::SegmentSplitter;
use super::volumes::{is_iso, is_rar};

/// Number of stderr lines kept for the failure message
const STDERR_TAIL: usize = 10;

/// Archive files found directly inside a directory
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ArchiveScan {
    /// Every `.rar` file, sorted by name
    pub rars: Vec<PathBuf>,
    /// Every `.iso` file, sorted by name
    pub isos: Vec<PathBuf>,
}

impl ArchiveScan {
    /// Whether nothing extractable was found
    pub fn is_empty(&self) -> bool {
        self.rars.is_empty() && self.isos.is_empty()
    }

    /// File names of the RAR files
    pub fn rar_names(&self) -> Vec<String> {
        self.rars.iter().filter_map(|p| file_name(p)).collect()
    }
}

/// List the RAR and ISO files directly inside `dir` (not recursive)
pub async fn scan_archives(dir: &Path) -> Result<ArchiveScan> {
    let mut scan = ArchiveScan::default();

    for name in list_file_names(dir).await? {
        if is_rar(&name) {
            scan.rars.push(dir.join(&name));
        } else if is_iso(&name) {
            scan.isos.push(dir.join(&name));
        }
    }

    scan.rars.sort();
    scan.isos.sort();

    debug!(
        ?dir,
        rars = scan.rars.len(),
        isos = scan.isos.len(),
        "scanned for archives"
    );

    Ok(scan)
}

/// Names of the regular files directly inside `dir`
pub async fn list_file_names(dir: &Path) -> Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }

    Ok(names)
}

pub(crate) fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
}

/// Run an archive tool to completion, streaming its stdout into `on_segment`
///
/// stdout is split with [`SegmentSplitter`] as it arrives so the pipe keeps
/// draining while `on_segment` runs. stderr is drained at the same time;
/// lines mentioning "warning" are logged at warn level and the rest at error
/// level. A non-zero exit becomes [`ExtractionError::ToolFailed`] carrying the
/// exit status and the last few stderr lines.
pub(crate) async fn run_tool(
    tool: &str,
    mut command: Command,
    archive: &Path,
    mut on_segment: impl FnMut(&str) + Send,
) -> Result<()> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|e| {
        Error::Extraction(ExtractionError::ToolUnavailable {
            tool: tool.to_string(),
            reason: e.to_string(),
        })
    })?;

    let stdout = child.stdout.take().ok_or_else(|| {
        Error::Extraction(ExtractionError::ToolUnavailable {
            tool: tool.to_string(),
            reason: "stdout was not captured".to_string(),
        })
    })?;
    let stderr = child.stderr.take().ok_or_else(|| {
        Error::Extraction(ExtractionError::ToolUnavailable {
            tool: tool.to_string(),
            reason: "stderr was not captured".to_string(),
        })
    })?;

    let drain_stdout = async {
        let mut reader = stdout;
        let mut splitter = SegmentSplitter::new();
        let mut buf = [0u8; 4096];
        loop {
            let read = reader.read(&mut buf).await?;
            if read == 0 {
                break;
            }
            splitter.push(&buf[..read], &mut on_segment);
        }
        splitter.finish(&mut on_segment);
        Ok::<(), std::io::Error>(())
    };

    let drain_stderr = async {
        let mut lines = BufReader::new(stderr).lines();
        let mut tail: Vec<String> = Vec::new();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim().to_string();
            if line.is_empty() {
                continue;
            }
            if line.to_lowercase().contains("warning") {
                warn!(tool, ?archive, message = %line, "archive tool warning");
            } else {
                error!(tool, ?archive, message = %line, "archive tool error output");
            }
            if tail.len() == STDERR_TAIL {
                tail.remove(0);
            }
            tail.push(line);
        }
        Ok::<Vec<String>, std::io::Error>(tail)
    };

    let (stdout_result, stderr_result) = tokio::join!(drain_stdout, drain_stderr);
    stdout_result?;
    let tail = stderr_result?;

    let status = child.wait().await?;
    if status.success() {
        return Ok(());
    }

    let mut reason = match status.code() {
        Some(code) => format!("exited with code {}", code),
        None => "terminated by signal".to_string(),
    };
    if !tail.is_empty() {
        reason.push_str(": ");
        reason.push_str(&tail.join("; "));
    }

    Err(Error::Extraction(ExtractionError::ToolFailed {
        tool: tool.to_string(),
        archive: archive.to_path_buf(),
        reason,
    }))
}

/// Resolve a tool binary: explicit path, then `PATH` lookup, then the bare name
pub(crate) fn resolve_binary(
    explicit: Option<&Path>,
    search_path: bool,
    candidates: &[&str],
) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if search_path {
        if let Some(found) = candidates.iter().find_map(|name| which::which(name).ok()) {
            return found;
        }
    }
    // Spawning fails later with ToolUnavailable if this is not runnable
    PathBuf::from(candidates.first().copied().unwrap_or_default())
}
