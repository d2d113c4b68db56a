//! File placement into the game library
//!
//! Extracted content is copied into `<library_root>/<game name>/<version>/`.
//! Top-level files are copied as they are. A top-level directory whose direct
//! children include an executable or binary (`exe`, `bin`, `dll`) is treated
//! as an installer wrapper and its contents are copied flat into the
//! destination. Any other directory is copied recursively under its own name.
//! The workspace is removed afterwards; a failed removal is only logged.

mod cleanup;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use cleanup::remove_workspace;

use crate::error::{Error, PlacementError, Result};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::fs;
use tracing::{debug, info};

/// Extensions that mark a directory as an installer wrapper
pub const WRAPPER_EXTENSIONS: &[&str] = &["exe", "bin", "dll"];

/// Library directory for one game version
///
/// Path separators and `.`/`..` components in the name or version are
/// replaced so the result always stays under `library_root`.
pub fn library_destination(library_root: &Path, game_name: &str, version: &str) -> PathBuf {
    library_root
        .join(safe_component(game_name))
        .join(safe_component(version))
}

fn safe_component(value: &str) -> String {
    let cleaned: String = value
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

/// Copy `extracted` into the library and remove `extracted` afterwards
///
/// Returns the destination directory.
///
/// # Errors
///
/// Any failed copy is returned as [`PlacementError::CopyFailed`]; the
/// workspace is left in place in that case so the attempt can be retried.
pub async fn place_files(
    extracted: &Path,
    library_root: &Path,
    game_name: &str,
    version: &str,
) -> Result<PathBuf> {
    let destination = library_destination(library_root, game_name, version);
    info!(?extracted, ?destination, "placing files into library");

    fs::create_dir_all(&destination)
        .await
        .map_err(|e| copy_failed(extracted, &destination, e))?;

    let mut copied = 0usize;
    let mut entries = fs::read_dir(extracted)
        .await
        .map_err(|e| copy_failed(extracted, &destination, e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| copy_failed(extracted, &destination, e))?
    {
        let source = entry.path();
        let target = destination.join(entry.file_name());
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| copy_failed(&source, &target, e))?;

        if file_type.is_dir() {
            if is_wrapper_dir(&source).await? {
                debug!(?source, "un-nesting installer wrapper directory");
                copied += copy_dir_contents(&source, &destination).await?;
            } else {
                copied += copy_dir_contents(&source, &target).await?;
            }
        } else {
            copy_file(&source, &target).await?;
            copied += 1;
        }
    }

    info!(?destination, files = copied, "placement complete");

    remove_workspace(extracted).await;

    Ok(destination)
}

/// Copy a release that had no archives into `workspace` unchanged
///
/// `source` may be a directory (its contents are copied) or a single file.
/// Returns the number of files copied.
pub async fn stage_source(source: &Path, workspace: &Path) -> Result<usize> {
    let metadata = fs::metadata(source)
        .await
        .map_err(|e| copy_failed(source, workspace, e))?;

    if metadata.is_dir() {
        return copy_dir_contents(source, workspace).await;
    }

    fs::create_dir_all(workspace)
        .await
        .map_err(|e| copy_failed(source, workspace, e))?;
    let target = match source.file_name() {
        Some(name) => workspace.join(name),
        None => workspace.join("payload"),
    };
    copy_file(source, &target).await?;
    Ok(1)
}

/// Whether any direct child of `dir` has a wrapper extension (case-insensitive)
pub async fn is_wrapper_dir(dir: &Path) -> Result<bool> {
    let mut entries = fs::read_dir(dir).await.map_err(|e| {
        Error::Placement(PlacementError::CopyFailed {
            source_path: dir.to_path_buf(),
            dest_path: PathBuf::new(),
            reason: format!("failed to read directory: {}", e),
        })
    })?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_binary = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                WRAPPER_EXTENSIONS
                    .iter()
                    .any(|w| w.eq_ignore_ascii_case(ext))
            });
        if is_binary {
            return Ok(true);
        }
    }

    Ok(false)
}

/// Recursively copy the contents of `source_dir` into `destination`
///
/// Returns the number of files copied.
fn copy_dir_contents<'a>(
    source_dir: &'a Path,
    destination: &'a Path,
) -> Pin<Box<dyn std::future::Future<Output = Result<usize>> + Send + 'a>> {
    Box::pin(async move {
        fs::create_dir_all(destination)
            .await
            .map_err(|e| copy_failed(source_dir, destination, e))?;

        let mut copied = 0;
        let mut entries = fs::read_dir(source_dir)
            .await
            .map_err(|e| copy_failed(source_dir, destination, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| copy_failed(source_dir, destination, e))?
        {
            let source = entry.path();
            let target = destination.join(entry.file_name());
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| copy_failed(&source, &target, e))?;

            if file_type.is_dir() {
                copied += copy_dir_contents(&source, &target).await?;
            } else {
                copy_file(&source, &target).await?;
                copied += 1;
            }
        }

        Ok(copied)
    })
}

async fn copy_file(source: &Path, target: &Path) -> Result<()> {
    fs::copy(source, target)
        .await
        .map_err(|e| copy_failed(source, target, e))?;
    debug!(?source, ?target, "copied file");
    Ok(())
}

fn copy_failed(source: &Path, dest: &Path, e: std::io::Error) -> Error {
    Error::Placement(PlacementError::CopyFailed {
        source_path: source.to_path_buf(),
        dest_path: dest.to_path_buf(),
        reason: e.to_string(),
    })
}
