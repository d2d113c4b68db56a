//! Pipelines, fake archive tools and release directories for tests

use async_trait::async_trait;
use game_ingest::extraction::{ExtractionEngine, Extractor, ProgressFn};
use game_ingest::{Config, Database, NoOpMetadataProvider, Pipeline};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Extractor that "unpacks" an archive by writing a fixed set of files
pub struct FakeExtractor {
    name: &'static str,
    files: Vec<(&'static str, &'static [u8])>,
}

impl FakeExtractor {
    pub fn new(name: &'static str, files: &[(&'static str, &'static [u8])]) -> Self {
        Self {
            name,
            files: files.to_vec(),
        }
    }
}

#[async_trait]
impl Extractor for FakeExtractor {
    async fn extract(
        &self,
        _archive: &Path,
        dest: &Path,
        on_progress: ProgressFn<'_>,
    ) -> game_ingest::Result<()> {
        tokio::fs::create_dir_all(dest).await?;
        for (i, (rel, contents)) in self.files.iter().enumerate() {
            let path = dest.join(rel);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, contents).await?;
            on_progress(((i + 1) * 100 / self.files.len()) as u8);
        }
        on_progress(100);
        Ok(())
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Configuration rooted in `root` with a fast retry policy
pub fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.persistence.database_path = root.join("ingest.db");
    config.paths.downloads_dir = root.join("downloads");
    config.paths.library_dir = root.join("library");
    config.paths.temp_dir = root.join("temp");
    config.paths.extract_dir = root.join("temp").join("extracted");
    config.queue.retry.initial_delay = Duration::from_millis(10);
    config.queue.retry.max_delay = Duration::from_millis(10);

    for dir in [
        &config.paths.downloads_dir,
        &config.paths.library_dir,
        &config.paths.extract_dir,
    ] {
        std::fs::create_dir_all(dir).expect("create test directory");
    }

    config
}

/// Pipeline whose RAR tool yields `game.iso` and whose ISO tool yields an installer
pub async fn create_pipeline(config: Config) -> Pipeline {
    let rar = FakeExtractor::new("fake-rar", &[("game.iso", b"image")]);
    let iso = FakeExtractor::new(
        "fake-iso",
        &[("setup.exe", b"MZ"), ("data/level1.pak", b"pak")],
    );

    let db = Database::new(&config.persistence.database_path)
        .await
        .expect("open database");
    Pipeline::with_components(
        config,
        db,
        ExtractionEngine::new(Arc::new(rar), Arc::new(iso)),
        Arc::new(NoOpMetadataProvider),
    )
    .await
    .expect("build pipeline")
}

/// Create `<downloads>/<name>` holding the given files
pub fn make_release(config: &Config, name: &str, files: &[(&str, &[u8])]) -> PathBuf {
    let dir = config.paths.downloads_dir.join(name);
    std::fs::create_dir_all(&dir).expect("create release directory");
    for (rel, contents) in files {
        std::fs::write(dir.join(rel), contents).expect("write release file");
    }
    dir
}

/// A split RAR release
pub fn make_rar_release(config: &Config, name: &str) -> PathBuf {
    make_release(
        config,
        name,
        &[
            ("game.part1.rar", b"vol1"),
            ("game.part2.rar", b"vol2"),
            ("game.nfo", b"info"),
        ],
    )
}
