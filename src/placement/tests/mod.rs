use crate::error::{Error, PlacementError};
use crate::placement::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

/// Every file under `root`, relative and sorted
fn tree(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().strip_prefix(root).unwrap().to_path_buf())
        .collect();
    files.sort();
    files
}

#[tokio::test]
async fn test_installer_wrapper_is_unnested() {
    let workspace = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    let extracted = workspace.path().join("root");
    write(&extracted, "installer/setup.exe", "MZ");
    write(&extracted, "readme.txt", "hello");

    let dest = place_files(&extracted, library.path(), "Game Title", "2.0.0")
        .await
        .unwrap();

    assert_eq!(dest, library.path().join("Game Title").join("2.0.0"));
    assert_eq!(
        tree(&dest),
        vec![PathBuf::from("readme.txt"), PathBuf::from("setup.exe")]
    );
    assert!(!dest.join("installer").exists());
    assert_eq!(std::fs::read_to_string(dest.join("setup.exe")).unwrap(), "MZ");
}

#[tokio::test]
async fn test_wrapper_detection_is_case_insensitive_and_keeps_nested_dirs() {
    let workspace = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    let extracted = workspace.path().join("root");
    write(&extracted, "Setup/GAME.DLL", "lib");
    write(&extracted, "Setup/data/level1.pak", "pak");

    let dest = place_files(&extracted, library.path(), "Game", "1.0")
        .await
        .unwrap();

    assert_eq!(
        tree(&dest),
        vec![PathBuf::from("GAME.DLL"), PathBuf::from("data/level1.pak")]
    );
}

#[tokio::test]
async fn test_plain_directories_are_copied_as_is() {
    let workspace = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    let extracted = workspace.path().join("root");
    write(&extracted, "Game.exe", "MZ");
    write(&extracted, "docs/manual.pdf", "pdf");
    write(&extracted, "docs/lang/en.txt", "en");

    let dest = place_files(&extracted, library.path(), "Game", "unknown")
        .await
        .unwrap();

    assert_eq!(
        tree(&dest),
        vec![
            PathBuf::from("Game.exe"),
            PathBuf::from("docs/lang/en.txt"),
            PathBuf::from("docs/manual.pdf"),
        ]
    );
}

#[tokio::test]
async fn test_workspace_is_removed_after_placement() {
    let workspace = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    let extracted = workspace.path().join("42");
    write(&extracted, "setup.exe", "MZ");

    place_files(&extracted, library.path(), "Game", "1.0")
        .await
        .unwrap();

    assert!(!extracted.exists());
}

#[tokio::test]
async fn test_placing_same_version_again_overwrites_files() {
    let workspace = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();

    let first = workspace.path().join("1");
    write(&first, "setup.exe", "old");
    place_files(&first, library.path(), "Game", "1.0")
        .await
        .unwrap();

    let second = workspace.path().join("2");
    write(&second, "setup.exe", "new");
    let dest = place_files(&second, library.path(), "Game", "1.0")
        .await
        .unwrap();

    assert_eq!(std::fs::read_to_string(dest.join("setup.exe")).unwrap(), "new");
}

#[tokio::test]
async fn test_missing_source_is_copy_failure() {
    let workspace = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();

    let err = place_files(
        &workspace.path().join("missing"),
        library.path(),
        "Game",
        "1.0",
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        Error::Placement(PlacementError::CopyFailed { .. })
    ));
}

#[test]
fn test_destination_never_escapes_library() {
    let root = Path::new("/library");
    assert_eq!(
        library_destination(root, "Game Title", "2.0.0"),
        PathBuf::from("/library/Game Title/2.0.0")
    );
    assert_eq!(
        library_destination(root, "..", "1.0"),
        PathBuf::from("/library/_/1.0")
    );
    assert_eq!(
        library_destination(root, "AC/DC Racing", "../x"),
        PathBuf::from("/library/AC_DC Racing/.._x")
    );
}

#[tokio::test]
async fn test_remove_workspace_tolerates_missing_directory() {
    let workspace = TempDir::new().unwrap();
    assert!(remove_workspace(&workspace.path().join("never-created")).await);

    let dir = workspace.path().join("present");
    write(&dir, "a/b.txt", "x");
    assert!(remove_workspace(&dir).await);
    assert!(!dir.exists());
}

#[tokio::test]
async fn test_stage_source_copies_directory_tree() {
    let downloads = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    let source = downloads.path().join("Game.v1.0-GRP");
    write(&source, "Game.exe", "MZ");
    write(&source, "data/a.pak", "pak");

    let target = workspace.path().join("7");
    let copied = stage_source(&source, &target).await.unwrap();

    assert_eq!(copied, 2);
    assert_eq!(
        tree(&target),
        vec![PathBuf::from("Game.exe"), PathBuf::from("data/a.pak")]
    );
    // Source is left untouched
    assert!(source.join("Game.exe").exists());
}

#[tokio::test]
async fn test_stage_source_accepts_single_file() {
    let downloads = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    write(downloads.path(), "setup.exe", "MZ");

    let target = workspace.path().join("8");
    let copied = stage_source(&downloads.path().join("setup.exe"), &target)
        .await
        .unwrap();

    assert_eq!(copied, 1);
    assert_eq!(tree(&target), vec![PathBuf::from("setup.exe")]);
}
