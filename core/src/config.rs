//! Client configuration.
//!
//! Values come from struct defaults, optionally overridden by serde input
//! (e.g. a host's stored options) or `MICROBLOG_*` environment variables.

use std::time::Duration;

use figment::{
    providers::{Env, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "http://twitter.com";
pub const DEFAULT_USER_AGENT: &str = concat!("microblog-core/", env!("CARGO_PKG_VERSION"));

const ENV_PREFIX: &str = "MICROBLOG_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Origin every operation path is appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Global per-request timeout; 0 disables it.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    /// Load configuration from all sources.
    ///
    /// Sources are merged in priority order:
    /// 1. Struct defaults (lowest)
    /// 2. `MICROBLOG_BASE_URL`, `MICROBLOG_TIMEOUT_SECS`, `MICROBLOG_USER_AGENT`
    ///
    /// # Errors
    /// Returns an error if a variable cannot be converted or the base URL
    /// does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config: Self = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Checks that `base_url` is an absolute http(s) URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidValue {
            key: "base_url".to_string(),
            value: self.base_url.clone(),
            reason,
        };
        let parsed = url::Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", parsed.scheme())));
        }
        Ok(())
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}
