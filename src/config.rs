use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::event::{HubConfig, DEFAULT_DEBOUNCE_WINDOW, DEFAULT_QUEUE_CAPACITY};
use crate::stream::DEFAULT_KEEPALIVE_INTERVAL;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("Failed to load env file: {0}")]
    DotEnv(#[from] dotenvy::Error),
}

/// Server configuration loaded from environment variables.
///
/// | Env Var                 | Default   |
/// |-------------------------|-----------|
/// | `HOST`                  | `0.0.0.0` |
/// | `PORT`                  | `8080`    |
/// | `EVENTS_ENABLED`        | `true`    |
/// | `EVENTS_DEBOUNCE_SECS`  | `5`       |
/// | `EVENTS_KEEPALIVE_SECS` | `30`      |
/// | `EVENTS_QUEUE_CAPACITY` | `8`       |
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub events_enabled: bool,
    pub hub: HubConfig,
    pub keepalive_interval: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_var(&lookup, "PORT", 8080u16)?;
        let events_enabled = match lookup("EVENTS_ENABLED") {
            Some(value) => crate::notify::parse_switch(&value),
            None => true,
        };
        let debounce_secs = parse_var(
            &lookup,
            "EVENTS_DEBOUNCE_SECS",
            DEFAULT_DEBOUNCE_WINDOW.as_secs(),
        )?;
        let keepalive_secs = parse_var(
            &lookup,
            "EVENTS_KEEPALIVE_SECS",
            DEFAULT_KEEPALIVE_INTERVAL.as_secs(),
        )?;
        let queue_capacity = parse_var(&lookup, "EVENTS_QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY)?;

        if keepalive_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "EVENTS_KEEPALIVE_SECS",
                value: "0".to_string(),
            });
        }
        if queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "EVENTS_QUEUE_CAPACITY",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            host,
            port,
            events_enabled,
            hub: HubConfig {
                debounce_window: Duration::from_secs(debounce_secs),
                queue_capacity,
            },
            keepalive_interval: Duration::from_secs(keepalive_secs),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

/// Loads `KEY=VALUE` pairs from an env file without overriding variables
/// that are already set. A missing file is not an error.
pub fn load_dotenv(path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let path = path.as_ref();
    match dotenvy::from_path(path) {
        Ok(()) => {
            info!(path = %path.display(), "Loaded env file");
            Ok(())
        }
        Err(e) if e.not_found() => {
            debug!(path = %path.display(), "No env file found");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
