//! Game metadata lookup
//!
//! The processor asks a [`MetadataProvider`] for candidate matches of the
//! cleaned game name. A miss or a catalog failure never fails ingestion.

mod catalog;

pub use catalog::CatalogMetadataProvider;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use utoipa::ToSchema;

/// One candidate match from a metadata catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GameMetadata {
    /// Title as listed by the catalog
    pub name: String,
    /// Release date (RFC 3339 for IGDB, catalog format for GiantBomb)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    /// Short description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Cover art URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    /// Catalog the match came from (`IGDB`, `GiantBomb`)
    pub source: String,
}

/// Source of game metadata
///
/// # Examples
///
/// ```
/// use game_ingest::metadata::{MetadataProvider, NoOpMetadataProvider};
///
/// # #[tokio::main]
/// # async fn main() -> game_ingest::Result<()> {
/// let provider = NoOpMetadataProvider;
/// assert!(provider.search("Some Game").await?.is_empty());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Search for games matching `name`, best match first
    async fn search(&self, name: &str) -> crate::Result<Vec<GameMetadata>>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Provider that never finds anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetadataProvider;

#[async_trait]
impl MetadataProvider for NoOpMetadataProvider {
    async fn search(&self, _name: &str) -> crate::Result<Vec<GameMetadata>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

#[allow(clippy::expect_used)]
static QUERY_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"v\d+(\.\d+)*").expect("query version regex is valid") // Static pattern, safe to panic
});

/// Normalize a game name before sending it to a catalog
///
/// Dashes and underscores become spaces, the first version token is dropped
/// and whitespace is collapsed.
pub fn clean_search_query(name: &str) -> String {
    let spaced = name.replace(['-', '_'], " ");
    let without_version = QUERY_VERSION.replace(&spaced, "");
    without_version
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
