//! IGDB and GiantBomb catalog client

use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{GameMetadata, MetadataProvider, clean_search_query};
use crate::config::MetadataConfig;
use crate::error::{Error, Result};

const IGDB_COVER_BASE: &str = "https://images.igdb.com/igdb/image/upload/t_cover_big";
const TOKEN_SAFETY_MARGIN_SECS: u64 = 3600;
const RESULT_LIMIT: u32 = 10;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct IgdbGame {
    name: String,
    #[serde(default)]
    first_release_date: Option<i64>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    cover: Option<IgdbCover>,
}

#[derive(Debug, Deserialize)]
struct IgdbCover {
    image_id: String,
}

#[derive(Debug, Deserialize)]
struct GiantBombResponse {
    #[serde(default)]
    results: Vec<GiantBombGame>,
}

#[derive(Debug, Deserialize)]
struct GiantBombGame {
    name: String,
    #[serde(default)]
    original_release_date: Option<String>,
    #[serde(default)]
    deck: Option<String>,
    #[serde(default)]
    image: Option<GiantBombImage>,
}

#[derive(Debug, Deserialize)]
struct GiantBombImage {
    #[serde(default)]
    medium_url: Option<String>,
}

/// Metadata provider backed by IGDB, falling back to GiantBomb
///
/// IGDB needs a Twitch client ID and secret; the OAuth token is cached until
/// an hour before it expires. GiantBomb needs an API key. A catalog without
/// credentials is skipped, and a failing catalog is logged and treated as a
/// miss.
pub struct CatalogMetadataProvider {
    http_client: reqwest::Client,
    config: MetadataConfig,
    token: Mutex<Option<CachedToken>>,
}

impl CatalogMetadataProvider {
    /// Create a provider from configuration
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: MetadataConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("game-ingest/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Metadata(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config,
            token: Mutex::new(None),
        })
    }

    fn igdb_credentials(&self) -> Option<(&str, &str)> {
        match (&self.config.igdb_client_id, &self.config.igdb_client_secret) {
            (Some(id), Some(secret)) => Some((id.as_str(), secret.as_str())),
            _ => None,
        }
    }

    /// Current IGDB access token, fetching a new one when the cache is stale
    async fn access_token(&self, client_id: &str, client_secret: &str) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        info!("requesting new IGDB access token");
        let response: TokenResponse = self
            .http_client
            .post(&self.config.twitch_token_url)
            .query(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let lifetime = response.expires_in.saturating_sub(TOKEN_SAFETY_MARGIN_SECS);
        let value = response.access_token;
        *cached = Some(CachedToken {
            value: value.clone(),
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        });

        Ok(value)
    }

    async fn search_igdb(&self, query: &str) -> Result<Vec<GameMetadata>> {
        let Some((client_id, client_secret)) = self.igdb_credentials() else {
            debug!("IGDB credentials not configured, skipping");
            return Ok(Vec::new());
        };

        let token = self.access_token(client_id, client_secret).await?;
        let body = format!(
            "search \"{}\"; fields name,first_release_date,summary,cover.*,category; where category = 0 & version_parent = null; limit {};",
            query.replace('"', ""),
            RESULT_LIMIT
        );

        let games: Vec<IgdbGame> = self
            .http_client
            .post(format!("{}/games", self.config.igdb_url.trim_end_matches('/')))
            .header("Client-ID", client_id)
            .bearer_auth(token)
            .body(body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(count = games.len(), "IGDB results");

        Ok(games
            .into_iter()
            .map(|game| GameMetadata {
                name: game.name,
                release_date: game.first_release_date.and_then(epoch_to_rfc3339),
                description: game.summary,
                cover_url: game
                    .cover
                    .map(|c| format!("{}/{}.jpg", IGDB_COVER_BASE, c.image_id)),
                source: "IGDB".to_string(),
            })
            .collect())
    }

    async fn search_giantbomb(&self, query: &str) -> Result<Vec<GameMetadata>> {
        let Some(api_key) = self.config.giantbomb_api_key.as_deref() else {
            debug!("GiantBomb API key not configured, skipping");
            return Ok(Vec::new());
        };

        let limit = RESULT_LIMIT.to_string();
        let response: GiantBombResponse = self
            .http_client
            .get(format!(
                "{}/search",
                self.config.giantbomb_url.trim_end_matches('/')
            ))
            .query(&[
                ("api_key", api_key),
                ("format", "json"),
                ("query", query),
                ("resources", "game"),
                ("field_list", "name,original_release_date,deck,image"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(count = response.results.len(), "GiantBomb results");

        Ok(response
            .results
            .into_iter()
            .map(|game| GameMetadata {
                name: game.name,
                release_date: game.original_release_date,
                description: game.deck,
                cover_url: game.image.and_then(|i| i.medium_url),
                source: "GiantBomb".to_string(),
            })
            .collect())
    }
}

fn epoch_to_rfc3339(secs: i64) -> Option<String> {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|d| d.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
}

#[async_trait]
impl MetadataProvider for CatalogMetadataProvider {
    async fn search(&self, name: &str) -> Result<Vec<GameMetadata>> {
        let query = clean_search_query(name);
        if query.is_empty() {
            return Ok(Vec::new());
        }
        info!(%query, "searching metadata catalogs");

        let mut results = match self.search_igdb(&query).await {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, %query, "IGDB search failed");
                Vec::new()
            }
        };

        if results.is_empty() {
            results = match self.search_giantbomb(&query).await {
                Ok(results) => results,
                Err(e) => {
                    warn!(error = %e, %query, "GiantBomb search failed");
                    Vec::new()
                }
            };
        }

        info!(%query, count = results.len(), "metadata search finished");
        Ok(results)
    }

    fn name(&self) -> &'static str {
        "igdb+giantbomb"
    }
}
