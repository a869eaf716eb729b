//! Configuration for the completion service client

use crate::llm::roles::DEFAULT_ROLE;
use crate::{ParleyError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Endpoint used when no configuration file overrides it
pub const DEFAULT_ENDPOINT: &str = "https://mybotbackend.onrender.com/api/chat";

/// Configuration for the chat client
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// URL the question is posted to
    pub endpoint: String,

    /// Optional key forwarded in the request body
    pub api_key: Option<String>,

    /// Milliseconds allowed for establishing the connection
    pub connect_timeout_ms: u64,

    /// Milliseconds allowed between body reads (`None` waits indefinitely)
    pub read_timeout_ms: Option<u64>,

    /// Role instruction used until the user picks another
    pub default_role: String,

    /// Whether "remember context" starts enabled
    pub remember_context: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            connect_timeout_ms: 10_000,
            read_timeout_ms: Some(60_000),
            default_role: DEFAULT_ROLE.to_string(),
            remember_context: false,
        }
    }
}

impl ClientConfig {
    /// Create a configuration for the given endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Set the API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = duration_ms(timeout);
        self
    }

    /// Set the read timeout
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout_ms = timeout.map(duration_ms);
        self
    }

    /// Set the default role instruction
    pub fn with_default_role(mut self, role: impl Into<String>) -> Self {
        self.default_role = role.into();
        self
    }

    /// Start with "remember context" enabled or disabled
    pub fn with_remember_context(mut self, enabled: bool) -> Self {
        self.remember_context = enabled;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.endpoint).map_err(|e| {
            ParleyError::ConfigError(format!("Invalid endpoint {:?}: {}", self.endpoint, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ParleyError::ConfigError(format!(
                "Endpoint must use http or https: {}",
                self.endpoint
            )));
        }

        if self.connect_timeout_ms == 0 {
            return Err(ParleyError::ConfigError(
                "connect_timeout_ms must be greater than zero".to_string(),
            ));
        }

        if self.read_timeout_ms == Some(0) {
            return Err(ParleyError::ConfigError(
                "read_timeout_ms must be greater than zero when set".to_string(),
            ));
        }

        if self.default_role.trim().is_empty() {
            return Err(ParleyError::ConfigError("default_role is empty".to_string()));
        }

        Ok(())
    }

    /// Parse a configuration from TOML; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ParleyError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());

        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Platform default location of the configuration file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("parley").join("config.toml"))
    }

    /// Load the default configuration file if it exists, otherwise use defaults
    pub fn load_or_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => {
                info!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Whole milliseconds, saturating for durations too large for `u64`
fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
