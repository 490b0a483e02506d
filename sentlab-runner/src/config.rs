//! Session configuration loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) is a valid
//! configuration. Secrets never live here: the social search token is read
//! from the environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use sentlab_core::data::{CircuitBreaker, HttpConfig};

/// File looked up in the working directory when no path is given.
pub const CONFIG_FILE_NAME: &str = "sentlab.toml";

/// Environment variable holding the social search bearer token.
pub const TWITTER_TOKEN_VAR: &str = "TWITTER_BEARER_TOKEN";

/// Listing pages accepted per headline request.
pub const MAX_NEWS_PAGES: u32 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Transport and circuit-breaker settings for the live sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub breaker_cooldown_secs: u64,
    pub breaker_failure_threshold: u32,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        let transport = HttpConfig::default();
        Self {
            timeout_secs: transport.timeout.as_secs(),
            max_retries: transport.max_retries,
            retry_base_delay_ms: transport.base_delay.as_millis() as u64,
            breaker_cooldown_secs: 30 * 60,
            breaker_failure_threshold: 3,
            user_agent: transport.user_agent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Directory holding cached artifacts.
    pub cache_dir: PathBuf,
    /// Headline listing pages read when a command does not say.
    pub news_pages: u32,
    /// Headlines shown by the latest-news listing.
    pub latest_headlines: usize,
    /// Posts kept per one-day social bucket.
    pub max_posts_per_bucket: usize,
    pub http: HttpSettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("data"),
            news_pages: 3,
            latest_headlines: 10,
            max_posts_per_bucket: sentlab_core::fetch::DEFAULT_MAX_PER_BUCKET,
            http: HttpSettings::default(),
        }
    }
}

impl SessionConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Load `explicit` when given, else `sentlab.toml` in the working
    /// directory when present, else the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(CONFIG_FILE_NAME);
                if default_path.is_file() {
                    debug!(path = %default_path.display(), "loading config");
                    Self::from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("cache_dir must not be empty".into()));
        }
        if !(1..=MAX_NEWS_PAGES).contains(&self.news_pages) {
            return Err(ConfigError::Invalid(format!(
                "news_pages must be between 1 and {MAX_NEWS_PAGES}, got {}",
                self.news_pages
            )));
        }
        if self.latest_headlines == 0 {
            return Err(ConfigError::Invalid("latest_headlines must be at least 1".into()));
        }
        if self.max_posts_per_bucket == 0 {
            return Err(ConfigError::Invalid(
                "max_posts_per_bucket must be at least 1".into(),
            ));
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid("http.timeout_secs must be at least 1".into()));
        }
        if self.http.breaker_failure_threshold == 0 {
            return Err(ConfigError::Invalid(
                "http.breaker_failure_threshold must be at least 1".into(),
            ));
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid("http.user_agent must not be empty".into()));
        }
        Ok(())
    }

    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            timeout: Duration::from_secs(self.http.timeout_secs),
            user_agent: self.http.user_agent.clone(),
            max_retries: self.http.max_retries,
            base_delay: Duration::from_millis(self.http.retry_base_delay_ms),
        }
    }

    pub fn circuit_breaker(&self) -> CircuitBreaker {
        CircuitBreaker::new(
            Duration::from_secs(self.http.breaker_cooldown_secs),
            self.http.breaker_failure_threshold,
        )
    }
}

/// Social search token from the environment, after loading `.env` if present.
pub fn twitter_token() -> Option<String> {
    dotenvy::dotenv().ok();
    std::env::var(TWITTER_TOKEN_VAR)
        .ok()
        .filter(|token| !token.trim().is_empty())
}
