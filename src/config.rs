//! Configuration types for game-ingest

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Top-level configuration
///
/// Every section has sensible defaults; [`Config::from_env`] overlays the
/// environment variables the service is deployed with.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Filesystem roots (downloads, library, temp, extraction workspace)
    #[serde(default)]
    pub paths: PathsConfig,

    /// Work queue behavior
    #[serde(default)]
    pub queue: QueueConfig,

    /// External archive tools
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Metadata catalog credentials and endpoints
    #[serde(default)]
    pub metadata: MetadataConfig,

    /// Data storage
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// Filesystem roots consumed by the pipeline
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PathsConfig {
    /// Root that relative submissions resolve against (default: "/app/downloads")
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,

    /// Managed library root (default: "/app/library")
    #[serde(default = "default_library_dir")]
    pub library_dir: PathBuf,

    /// Scratch root (default: "/app/temp")
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Per-task extraction workspaces live under this root (default: "/app/temp/extracted")
    #[serde(default = "default_extract_dir")]
    pub extract_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            downloads_dir: default_downloads_dir(),
            library_dir: default_library_dir(),
            temp_dir: default_temp_dir(),
            extract_dir: default_extract_dir(),
        }
    }
}

/// Work queue configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct QueueConfig {
    /// Retry policy applied to whole processing runs
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Retry configuration for failed processing runs
///
/// The defaults give a fixed one-second delay between three attempts.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetryConfig {
    /// Total attempts including the first one (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 1 second)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier applied to the delay after each retry (default: 1.0, fixed delay)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

/// External tool paths
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ToolsConfig {
    /// Path to unrar executable (auto-detected if None)
    #[serde(default)]
    pub unrar_path: Option<PathBuf>,

    /// Path to 7z executable (auto-detected if None)
    #[serde(default)]
    pub sevenzip_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            unrar_path: None,
            sevenzip_path: None,
            search_path: true,
        }
    }
}

/// Metadata catalog configuration (IGDB with GiantBomb fallback)
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct MetadataConfig {
    /// Twitch application client ID used for IGDB
    #[serde(default)]
    pub igdb_client_id: Option<String>,

    /// Twitch application client secret used for IGDB
    #[serde(default)]
    pub igdb_client_secret: Option<String>,

    /// GiantBomb API key
    #[serde(default)]
    pub giantbomb_api_key: Option<String>,

    /// IGDB API base URL (default: "https://api.igdb.com/v4")
    #[serde(default = "default_igdb_url")]
    pub igdb_url: String,

    /// Twitch OAuth token endpoint (default: "https://id.twitch.tv/oauth2/token")
    #[serde(default = "default_twitch_token_url")]
    pub twitch_token_url: String,

    /// GiantBomb API base URL (default: "https://www.giantbomb.com/api")
    #[serde(default = "default_giantbomb_url")]
    pub giantbomb_url: String,

    /// Per-request timeout (default: 15 seconds)
    #[serde(default = "default_metadata_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            igdb_client_id: None,
            igdb_client_secret: None,
            giantbomb_api_key: None,
            igdb_url: default_igdb_url(),
            twitch_token_url: default_twitch_token_url(),
            giantbomb_url: default_giantbomb_url(),
            timeout: default_metadata_timeout(),
        }
    }
}

impl MetadataConfig {
    /// Whether any catalog has usable credentials
    pub fn has_credentials(&self) -> bool {
        (self.igdb_client_id.is_some() && self.igdb_client_secret.is_some())
            || self.giantbomb_api_key.is_some()
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// Database path (default: "./game-ingest.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:3000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

impl Config {
    /// Build a configuration from the process environment
    ///
    /// Recognized variables: `DOWNLOADS_DIR`, `LIBRARY_DIR`, `TEMP_DIR`,
    /// `EXTRACT_DIR`, `DATABASE_PATH`, `BIND_ADDRESS`, `UNRAR_PATH`,
    /// `SEVENZIP_PATH`, `IGDB_CLIENT_ID`, `IGDB_CLIENT_SECRET`,
    /// `GIANTBOMB_API_KEY`, `MAX_ATTEMPTS` and `RETRY_DELAY_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Config::default();

        if let Some(dir) = get("DOWNLOADS_DIR") {
            config.paths.downloads_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("LIBRARY_DIR") {
            config.paths.library_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("TEMP_DIR") {
            config.paths.temp_dir = PathBuf::from(dir);
            config.paths.extract_dir = config.paths.temp_dir.join("extracted");
        }
        if let Some(dir) = get("EXTRACT_DIR") {
            config.paths.extract_dir = PathBuf::from(dir);
        }
        if let Some(path) = get("DATABASE_PATH") {
            config.persistence.database_path = PathBuf::from(path);
        }
        if let Some(addr) = get("BIND_ADDRESS") {
            config.api.bind_address = parse_value("BIND_ADDRESS", &addr)?;
        }
        if let Some(path) = get("UNRAR_PATH") {
            config.tools.unrar_path = Some(PathBuf::from(path));
        }
        if let Some(path) = get("SEVENZIP_PATH") {
            config.tools.sevenzip_path = Some(PathBuf::from(path));
        }
        config.metadata.igdb_client_id = get("IGDB_CLIENT_ID");
        config.metadata.igdb_client_secret = get("IGDB_CLIENT_SECRET");
        config.metadata.giantbomb_api_key = get("GIANTBOMB_API_KEY");

        if let Some(attempts) = get("MAX_ATTEMPTS") {
            let attempts: u32 = parse_value("MAX_ATTEMPTS", &attempts)?;
            if attempts == 0 {
                return Err(Error::Config {
                    message: "MAX_ATTEMPTS must be at least 1".to_string(),
                    key: Some("MAX_ATTEMPTS".to_string()),
                });
            }
            config.queue.retry.max_attempts = attempts;
        }
        if let Some(delay) = get("RETRY_DELAY_SECS") {
            let secs: u64 = parse_value("RETRY_DELAY_SECS", &delay)?;
            config.queue.retry.initial_delay = Duration::from_secs(secs);
            config.queue.retry.max_delay = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e| Error::Config {
        message: format!("invalid value '{}' for {}: {}", raw, key, e),
        key: Some(key.to_string()),
    })
}

fn default_downloads_dir() -> PathBuf {
    PathBuf::from("/app/downloads")
}

fn default_library_dir() -> PathBuf {
    PathBuf::from("/app/library")
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("/app/temp")
}

fn default_extract_dir() -> PathBuf {
    PathBuf::from("/app/temp/extracted")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./game-ingest.db")
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_igdb_url() -> String {
    "https://api.igdb.com/v4".to_string()
}

fn default_twitch_token_url() -> String {
    "https://id.twitch.tv/oauth2/token".to_string()
}

fn default_giantbomb_url() -> String {
    "https://www.giantbomb.com/api".to_string()
}

fn default_metadata_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
