use crate::{BrowserError, Result, timeouts::secs};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Scheme prepended to input typed without one ("example.com").
    #[serde(default = "default_scheme")]
    pub default_scheme: String,
    /// Identity sent as the User-Agent header on every outbound request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistoryConfig {
    /// Entries untouched for longer than this are pruned after each record.
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
    /// Cap for the in-memory recent-URL list.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
    /// Override for the history database path (defaults under the data dir).
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaConfig {
    /// Download and cache post thumbnails. Off means listings render text-only.
    #[serde(default = "default_thumbnails")]
    pub thumbnails: bool,
    /// Override for the thumbnail cache dir (defaults under the cache dir).
    pub cache_dir: Option<PathBuf>,
}

fn default_request_timeout() -> u64 {
    secs::REQUEST
}

fn default_scheme() -> String {
    "https".to_string()
}

fn default_user_agent() -> String {
    format!("pulp/{}", env!("CARGO_PKG_VERSION"))
}

fn default_retention_days() -> u64 {
    90
}

fn default_recent_limit() -> usize {
    100
}

fn default_thumbnails() -> bool {
    true
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: default_request_timeout(),
            default_scheme: default_scheme(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            recent_limit: default_recent_limit(),
            db_path: None,
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            thumbnails: default_thumbnails(),
            cache_dir: None,
        }
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    default_config_dir().map(|p| p.join("config.toml"))
}

pub fn default_config_dir() -> Result<PathBuf> {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|home| PathBuf::from(home).join(".config"))
        })
        .map(|p| p.join("pulp"))
        .ok_or_else(|| BrowserError::Config("Could not determine config directory".into()))
}

/// Directory for state that persists between runs (the history database).
pub fn default_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|p| p.join("pulp"))
        .ok_or_else(|| BrowserError::Config("Could not determine data directory".into()))
}

/// Directory for rebuildable artifacts (the thumbnail cache).
pub fn default_cache_dir() -> Result<PathBuf> {
    dirs::cache_dir()
        .map(|p| p.join("pulp"))
        .ok_or_else(|| BrowserError::Config("Could not determine cache directory".into()))
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        let global_path = default_config_path()?;
        if global_path.exists() {
            let content = std::fs::read_to_string(&global_path)?;
            config = toml::from_str(&content)?;
        }

        config.load_from_env();

        Ok(config)
    }

    pub fn load_with_overrides(&self, cli_overrides: ConfigOverrides) -> Self {
        let mut config = self.clone();

        if let Some(timeout) = cli_overrides.timeout {
            config.network.request_timeout_seconds = timeout;
        }
        if let Some(user_agent) = cli_overrides.user_agent {
            config.network.user_agent = user_agent;
        }
        if let Some(thumbnails) = cli_overrides.thumbnails {
            config.media.thumbnails = thumbnails;
        }

        config
    }

    fn load_from_env(&mut self) {
        if let Ok(timeout) = std::env::var("PULP_TIMEOUT")
            && let Ok(timeout) = timeout.parse()
        {
            self.network.request_timeout_seconds = timeout;
        }
        if let Ok(scheme) = std::env::var("PULP_DEFAULT_SCHEME") {
            self.network.default_scheme = scheme;
        }
        if let Ok(user_agent) = std::env::var("PULP_USER_AGENT") {
            self.network.user_agent = user_agent;
        }
        if let Ok(days) = std::env::var("PULP_RETENTION_DAYS")
            && let Ok(days) = days.parse()
        {
            self.history.retention_days = days;
        }
        if let Ok(thumbnails) = std::env::var("PULP_THUMBNAILS") {
            self.media.thumbnails = thumbnails == "true" || thumbnails == "1";
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.network.request_timeout_seconds == 0 {
            return Err(BrowserError::Config(
                "request_timeout_seconds must be greater than 0".into(),
            ));
        }

        if self.network.default_scheme != "http" && self.network.default_scheme != "https" {
            return Err(BrowserError::Config(format!(
                "default_scheme must be http or https, got {}",
                self.network.default_scheme
            )));
        }

        if self.network.user_agent.trim().is_empty() {
            return Err(BrowserError::Config("user_agent must not be empty".into()));
        }

        if self.history.retention_days == 0 {
            return Err(BrowserError::Config(
                "retention_days must be greater than 0".into(),
            ));
        }

        if self.history.recent_limit == 0 {
            return Err(BrowserError::Config(
                "recent_limit must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    pub fn show(&self) -> String {
        format!(
            r#"Network:
  Request Timeout: {}s
  Default Scheme: {}
  User Agent: {}

History:
  Retention: {} days
  Recent Limit: {}
  Database: {}

Media:
  Thumbnails: {}
  Cache Dir: {}
"#,
            self.network.request_timeout_seconds,
            self.network.default_scheme,
            self.network.user_agent,
            self.history.retention_days,
            self.history.recent_limit,
            self.history
                .db_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "default".into()),
            self.media.thumbnails,
            self.media
                .cache_dir
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "default".into()),
        )
    }
}

#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub timeout: Option<u64>,
    pub user_agent: Option<String>,
    pub thumbnails: Option<bool>,
}
