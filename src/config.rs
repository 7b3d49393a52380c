//! Configuration manager for clientele.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::FromRef;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::AppState;
use crate::user::Zone;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_ADDRESS: &str = "0.0.0.0:8888";
const DEFAULT_LOG_LEVEL: &str = "info";
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Instance name.
    pub name: String,
    /// Public URL of current instance.
    #[serde(default)]
    pub url: String,
    /// Socket address to bind, such as `0.0.0.0:8888`.
    pub address: Option<String>,
    /// UTC offset used to interpret calendar days, such as `-03:00`.
    /// Falls back to the host time zone, daylight saving time included.
    pub timezone: Option<String>,
    #[serde(default)]
    version: String,
    #[serde(skip)]
    path: PathBuf,
    /// Related to PostgreSQL configuration.
    #[serde(skip_serializing)]
    pub postgres: Option<Postgres>,
    /// Related to logs, traces and metrics.
    #[serde(skip_serializing)]
    pub telemetry: Option<Telemetry>,
}

/// PostgreSQL configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Postgres {
    /// Hostname:(?port) for PostgreSQL instance.
    pub address: String,
    /// Database name.
    pub database: Option<String>,
    /// Username credential to connect.
    pub username: Option<String>,
    /// Password credential to connect.
    pub password: Option<String>,
    /// Maximum pool connections.
    pub pool_size: Option<u32>,
}

/// Telemetry configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_level: Option<String>,
    /// OTLP gRPC collector receiving logs and spans.
    pub otlp_endpoint: Option<String>,
    /// Expose Prometheus metrics on `/metrics`.
    #[serde(default = "enabled")]
    pub prometheus: bool,
}

fn enabled() -> bool {
    true
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            log_level: None,
            otlp_endpoint: None,
            prometheus: true,
        }
    }
}

impl FromRef<AppState> for Arc<Configuration> {
    fn from_ref(state: &AppState) -> Arc<Configuration> {
        Arc::clone(&state.config)
    }
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Application version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Address to bind.
    pub fn address(&self) -> &str {
        self.address.as_deref().unwrap_or(DEFAULT_ADDRESS)
    }

    /// Telemetry settings, defaulted when the section is absent.
    pub fn telemetry(&self) -> Telemetry {
        self.telemetry.clone().unwrap_or_default()
    }

    /// Default log filter.
    pub fn log_level(&self) -> String {
        self.telemetry
            .as_ref()
            .and_then(|t| t.log_level.clone())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_owned())
    }

    /// Zone used to compute day boundaries.
    pub fn zone(&self) -> Zone {
        match self.timezone.as_deref().map(str::parse::<FixedOffset>) {
            Some(Ok(offset)) => Zone::Fixed(offset),
            Some(Err(err)) => {
                tracing::warn!(error = %err, timezone = ?self.timezone, "invalid `timezone`, using host time zone");
                Zone::Host
            },
            None => Zone::Host,
        }
    }

    /// Normalizes a URL string by ensuring it starts with a valid scheme
    /// (`http` or `https`).
    fn normalize_url(&self, url: &str) -> Result<String, url::ParseError> {
        let url_with_scheme =
            if url.starts_with("http://") || url.starts_with("https://") {
                url.to_string()
            } else {
                format!("https://{url}")
            };

        let parsed_url = Url::parse(&url_with_scheme)?;
        Ok(parsed_url.to_string())
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location.
    pub fn read(self) -> Result<Arc<Self>, url::ParseError> {
        let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
        let file_path = if self.path.is_file() {
            &self.path
        } else {
            &default_path
        };

        match File::open(file_path) {
            Ok(file) => {
                let config: Configuration = match serde_yaml::from_reader(file)
                {
                    Ok(config) => config,
                    Err(err) => {
                        return Ok(Arc::new(self.error(err)));
                    },
                };

                Ok(Arc::new(self.finalize(config)?))
            },
            Err(err) => Ok(Arc::new(self.error(err))),
        }
    }

    /// Parse a configuration from YAML text.
    pub fn from_yaml(self, yaml: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Configuration = serde_yaml::from_str(yaml)?;
        Ok(self.finalize(config)?)
    }

    fn finalize(&self, mut config: Configuration) -> Result<Self, url::ParseError> {
        // set app version.
        config.version = VERSION.to_owned();
        config.path = self.path.clone();

        if !config.url.is_empty() {
            config.url = self.normalize_url(&config.url)?;
        }

        Ok(config)
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(error = %err, "`config.yaml` file not found or invalid");
        Self {
            version: VERSION.to_owned(),
            ..Default::default()
        }
    }
}
