//! Server configuration.
//!
//! Loading flow:
//! 1. Start with compiled [`ServerConfig::default()`]
//! 2. Merge the YAML file if it exists (a missing file is not an error)
//! 3. Apply `CALENDAR_*` environment variables (highest priority)

use std::path::Path;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";
pub const ENV_PREFIX: &str = "CALENDAR_";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid configuration value: {0}")]
    InvalidValue(String),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self::Load(Box::new(e))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address. A leading `:` (e.g. `":8080"`) binds every interface.
    pub host: String,
    /// Per-request deadline, in humantime form (`"10s"`, `"1m"`).
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0:8080".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    /// Load from `path` with env overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!(?path, "loading server config");
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::InvalidValue("host must not be empty".into()));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidValue("timeout must be positive".into()));
        }
        Ok(())
    }

    /// Address suitable for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        if self.host.starts_with(':') {
            format!("0.0.0.0{}", self.host)
        } else {
            self.host.clone()
        }
    }
}
