//! Path normalization for submitted download paths
//!
//! Every path that enters the pipeline goes through [`normalize_download_path`]
//! first, so that two spellings of the same location compare equal in the task
//! store and in the admission dedup set.

use std::path::{Component, Path, PathBuf};

/// Resolve `input` against `downloads_root` and normalize it lexically
///
/// Relative inputs are joined onto the downloads root; absolute inputs are kept.
/// The result has no `.` segments, `..` segments are resolved against the
/// preceding component, and trailing separators are dropped. No filesystem
/// access happens here: symlinks are not followed and the path need not exist.
///
/// # Examples
///
/// ```
/// use game_ingest::paths::normalize_download_path;
/// use std::path::{Path, PathBuf};
///
/// let root = Path::new("/downloads");
/// assert_eq!(
///     normalize_download_path("Game.v1.0-GROUP/", root),
///     PathBuf::from("/downloads/Game.v1.0-GROUP")
/// );
/// assert_eq!(
///     normalize_download_path("/downloads/./x/../Game", root),
///     PathBuf::from("/downloads/Game")
/// );
/// ```
pub fn normalize_download_path(input: impl AsRef<Path>, downloads_root: &Path) -> PathBuf {
    let input = input.as_ref();
    let joined = if input.is_absolute() {
        input.to_path_buf()
    } else {
        downloads_root.join(input)
    };

    // A relative downloads root is anchored to the working directory
    let joined = if joined.is_absolute() {
        joined
    } else {
        std::path::absolute(&joined).unwrap_or(joined)
    };

    lexical_normalize(&joined)
}

/// Collapse `.` and `..` segments without touching the filesystem
///
/// `..` at the root stays at the root, matching POSIX path resolution.
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// The final path component as text, used for naming
pub fn folder_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Text a release name is parsed from: the folder name, or the file stem
/// when the source is a single file
pub fn release_label(path: &Path, is_file: bool) -> String {
    if !is_file {
        return folder_name(path);
    }
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
