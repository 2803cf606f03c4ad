//! Configuration for harvester.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (HARVESTER_CONFIG, REDDIT_CLIENT_ID, REDDIT_CLIENT_SECRET)
//! 2. Config file (.harvester/config.yaml)
//! 3. Defaults (built-in catalog, 360s fetch timeout)
//!
//! Config file discovery:
//! - HARVESTER_CONFIG if set
//! - Searches current directory and parents for .harvester/config.yaml
//! - Falls back to ~/.harvester/config.yaml
//!
//! Credentials are never read from the config file.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{default_catalog, Source};

/// Environment variable holding the Reddit application id
pub const CLIENT_ID_VAR: &str = "REDDIT_CLIENT_ID";

/// Environment variable holding the Reddit application secret
pub const CLIENT_SECRET_VAR: &str = "REDDIT_CLIENT_SECRET";

/// Environment variable pointing at an explicit config file
pub const CONFIG_PATH_VAR: &str = "HARVESTER_CONFIG";

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Fatal configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(&'static str),
}

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub reddit: Option<RedditSection>,
    #[serde(default)]
    pub ingest: Option<IngestSection>,
    #[serde(default)]
    pub sources: Option<Vec<Source>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedditSection {
    pub user_agent: Option<String>,
    pub submission_limit: Option<usize>,
    pub time_filter: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestSection {
    pub fetch_timeout_seconds: Option<u64>,
    pub max_concurrent_submissions: Option<usize>,
    pub dedup: Option<DedupMode>,
    pub on_media_error: Option<MediaErrorPolicy>,
}

/// How already-ingested items are detected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupMode {
    /// Skip a submission if any file starts with `{source}{submission}`
    #[default]
    Submission,

    /// Check each media item's own `{source}{submission}_{media}.` prefix
    Media,
}

/// What a failed media fetch does to the rest of its submission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaErrorPolicy {
    /// Move on to the next media item
    #[default]
    Continue,

    /// Give up on the remaining media items of the submission
    AbortSubmission,
}

/// Reddit endpoints and listing options
#[derive(Debug, Clone)]
pub struct RedditSettings {
    pub user_agent: String,
    pub submission_limit: usize,
    pub time_filter: String,
    pub auth_url: String,
    pub api_url: String,
}

impl Default for RedditSettings {
    fn default() -> Self {
        Self {
            user_agent: format!("harvester/{}", env!("CARGO_PKG_VERSION")),
            submission_limit: 3000,
            time_filter: "all".to_string(),
            auth_url: "https://www.reddit.com/api/v1/access_token".to_string(),
            api_url: "https://oauth.reddit.com".to_string(),
        }
    }
}

/// Ingestion behaviour
#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Bound on a single media download
    pub fetch_timeout: Duration,

    /// Submissions processed at once within a source (0 = unbounded)
    pub max_concurrent_submissions: usize,

    pub dedup: DedupMode,

    pub on_media_error: MediaErrorPolicy,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(360),
            max_concurrent_submissions: 32,
            dedup: DedupMode::default(),
            on_media_error: MediaErrorPolicy::default(),
        }
    }
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Ordered crawl catalog
    pub sources: Vec<Source>,
    pub reddit: RedditSettings,
    pub ingest: IngestSettings,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            sources: default_catalog(),
            reddit: RedditSettings::default(),
            ingest: IngestSettings::default(),
            config_file: None,
        }
    }
}

/// Application credentials, passed explicitly to the source client
#[derive(Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl RedditCredentials {
    /// Read credentials from REDDIT_CLIENT_ID / REDDIT_CLIENT_SECRET
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through an arbitrary lookup (empty counts as missing)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::MissingEnv(name))
        };

        Ok(Self {
            client_id: read(CLIENT_ID_VAR)?,
            client_secret: read(CLIENT_SECRET_VAR)?,
        })
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    if let Ok(explicit) = std::env::var(CONFIG_PATH_VAR) {
        return Some(PathBuf::from(explicit));
    }

    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".harvester").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    let home_config = dirs::home_dir()?.join(".harvester").join("config.yaml");
    home_config.exists().then_some(home_config)
}

/// Load and parse config file
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse config file contents
pub fn parse_config(content: &str) -> Result<ConfigFile> {
    Ok(serde_yaml::from_str(content)?)
}

/// Merge a parsed config file over the defaults
pub fn resolve(file: Option<ConfigFile>, config_file: Option<PathBuf>) -> Result<ResolvedConfig> {
    let mut config = ResolvedConfig {
        config_file,
        ..Default::default()
    };

    let Some(file) = file else {
        return Ok(config);
    };

    let reddit = file.reddit.unwrap_or_default();
    if let Some(user_agent) = reddit.user_agent {
        config.reddit.user_agent = user_agent;
    }
    if let Some(limit) = reddit.submission_limit {
        config.reddit.submission_limit = limit;
    }
    if let Some(time_filter) = reddit.time_filter {
        config.reddit.time_filter = time_filter;
    }

    let ingest = file.ingest.unwrap_or_default();
    if let Some(secs) = ingest.fetch_timeout_seconds {
        if secs == 0 {
            anyhow::bail!("ingest.fetch_timeout_seconds must be greater than zero");
        }
        config.ingest.fetch_timeout = Duration::from_secs(secs);
    }
    if let Some(max) = ingest.max_concurrent_submissions {
        config.ingest.max_concurrent_submissions = max;
    }
    if let Some(dedup) = ingest.dedup {
        config.ingest.dedup = dedup;
    }
    if let Some(policy) = ingest.on_media_error {
        config.ingest.on_media_error = policy;
    }

    if let Some(sources) = file.sources {
        if sources.is_empty() {
            anyhow::bail!("sources must not be empty when given");
        }
        if let Some(bad) = sources.iter().find(|s| s.id.trim().is_empty()) {
            anyhow::bail!("source with description '{}' has an empty id", bad.description);
        }
        config.sources = sources;
    }

    Ok(config)
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let config_file = find_config_file();

    let parsed = match &config_file {
        Some(path) => Some(load_config_file(path)?),
        None => None,
    };

    resolve(parsed, config_file)
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}
