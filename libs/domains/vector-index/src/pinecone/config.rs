use std::fmt;
use std::time::Duration;

use core_config::{ConfigError, FromEnv, env_or_default, env_parse_optional, env_parse_or, env_required};

pub const DEFAULT_CONTROLLER_URL: &str = "https://api.pinecone.io";
pub const DEFAULT_API_VERSION: &str = "2025-04";

/// Pinecone connection configuration
#[derive(Clone)]
pub struct PineconeConfig {
    pub api_key: String,
    pub controller_url: String,
    pub api_version: String,
    pub timeout_secs: u64,
    /// Delay between readiness probes after a create
    pub ready_poll_ms: u64,
    /// `None` waits until the index is ready, however long that takes
    pub ready_timeout_secs: Option<u64>,
}

impl PineconeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            controller_url: DEFAULT_CONTROLLER_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout_secs: 30,
            ready_poll_ms: 1000,
            ready_timeout_secs: None,
        }
    }

    pub fn with_controller_url(mut self, url: impl Into<String>) -> Self {
        self.controller_url = url.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_ready_poll(mut self, millis: u64) -> Self {
        self.ready_poll_ms = millis;
        self
    }

    pub fn with_ready_timeout(mut self, secs: u64) -> Self {
        self.ready_timeout_secs = Some(secs);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn ready_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ready_poll_ms)
    }

    pub fn ready_timeout(&self) -> Option<Duration> {
        self.ready_timeout_secs.map(Duration::from_secs)
    }
}

impl FromEnv for PineconeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: env_required("PINECONE_API_KEY")?,
            controller_url: env_or_default("PINECONE_CONTROLLER_URL", DEFAULT_CONTROLLER_URL),
            api_version: env_or_default("PINECONE_API_VERSION", DEFAULT_API_VERSION),
            timeout_secs: env_parse_or("PINECONE_TIMEOUT_SECS", 30)?,
            ready_poll_ms: env_parse_or("PINECONE_READY_POLL_MS", 1000)?,
            ready_timeout_secs: env_parse_optional("PINECONE_READY_TIMEOUT_SECS")?,
        })
    }
}

impl fmt::Debug for PineconeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PineconeConfig")
            .field("api_key", &"<redacted>")
            .field("controller_url", &self.controller_url)
            .field("api_version", &self.api_version)
            .field("timeout_secs", &self.timeout_secs)
            .field("ready_poll_ms", &self.ready_poll_ms)
            .field("ready_timeout_secs", &self.ready_timeout_secs)
            .finish()
    }
}
