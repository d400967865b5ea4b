// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server configuration module
//!
//! Configuration is resolved once, before the listener starts. The bind port
//! comes from the `PORT` environment variable and falls back to
//! [`DEFAULT_PORT`]; everything else can be tuned through an optional
//! `config.json` or `SERVER_`-prefixed environment variables.

use std::time::Duration;

use anyhow::{Result, ensure};
use config::{Config, ConfigError, Environment as ConfigEnv, File};
use serde::{Deserialize, Deserializer, Serialize, de};

use crate::error::{ServerError, ServerResult};

/// Port used when `PORT` is unset or empty
pub const DEFAULT_PORT: &str = "8080";

/// Origin allowed to make credentialed cross-origin requests by default
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:8080";

const PORT_ENV_VAR: &str = "PORT";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_GRACE_PERIOD_SECONDS: u64 = 60;
const MAX_GRACE_PERIOD_SECONDS: u64 = 600;

/// Upper bound on how long shutdown waits for in-flight requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GracePeriod(Duration);

impl GracePeriod {
    /// Create a new `GracePeriod`, ensuring the value is within valid bounds
    ///
    /// # Errors
    ///
    /// Returns an error if the period is 0 or greater than 600 seconds
    pub fn new(seconds: u64) -> Result<Self> {
        ensure!(seconds != 0, "grace period must be greater than 0");
        ensure!(
            seconds <= MAX_GRACE_PERIOD_SECONDS,
            "grace period cannot exceed {MAX_GRACE_PERIOD_SECONDS}"
        );
        Ok(Self(Duration::from_secs(seconds)))
    }

    /// Default grace period (60 seconds)
    pub const fn default_value() -> Self {
        Self(Duration::from_secs(DEFAULT_GRACE_PERIOD_SECONDS))
    }

    /// Short grace period for tests (5 seconds)
    pub const fn testing() -> Self {
        Self(Duration::from_secs(5))
    }

    /// Get the grace period as a duration
    pub fn value(&self) -> Duration {
        self.0
    }
}

impl<'de> Deserialize<'de> for GracePeriod {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = u64::deserialize(deserializer)?;
        Self::new(seconds).map_err(|e| de::Error::custom(e.to_string()))
    }
}

impl Default for GracePeriod {
    fn default() -> Self {
        Self::default_value()
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind, all interfaces by default
    pub host: String,
    /// Bind port
    ///
    /// Kept as a string: a malformed value is only detected when binding.
    pub port: String,
    /// Maximum wait for in-flight requests during shutdown (validated range: 1-600)
    pub grace_period_seconds: GracePeriod,
    /// Origins allowed to make credentialed cross-origin requests
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT.to_string(),
            grace_period_seconds: GracePeriod::default(),
            allowed_origins: vec![DEFAULT_ALLOWED_ORIGIN.to_string()],
        }
    }
}

impl ServerConfig {
    /// Create configuration from environment variables and optional configuration files
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if configuration is invalid or cannot be loaded.
    pub fn from_env() -> ServerResult<Self> {
        Self::load().map_err(|e| ServerError::Config {
            message: format!("failed to load configuration: {e}"),
        })
    }

    /// Load configuration, taking the port from the `PORT` environment variable
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_port(std::env::var(PORT_ENV_VAR).ok())
    }

    /// Load configuration using the config crate with hierarchical sources
    ///
    /// Configuration is loaded in the following order (later sources override earlier ones):
    /// 1. Default values
    /// 2. Configuration file (config.json)
    /// 3. Environment variables with SERVER_ prefix
    /// 4. `port`, when present and non-empty
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or is invalid.
    pub fn load_with_port(port: Option<String>) -> Result<Self, ConfigError> {
        let port = port.filter(|value| !value.is_empty());

        Config::builder()
            .set_default("host", DEFAULT_HOST)?
            .set_default("port", DEFAULT_PORT)?
            .set_default("grace_period_seconds", DEFAULT_GRACE_PERIOD_SECONDS)?
            .set_default("allowed_origins", vec![DEFAULT_ALLOWED_ORIGIN])?
            .add_source(File::with_name("config.json").required(false))
            .add_source(
                ConfigEnv::with_prefix("SERVER")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("allowed_origins"),
            )
            .set_override_option("port", port)?
            .build()?
            .try_deserialize()
    }

    /// Create configuration optimized for testing
    pub fn for_testing() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: "0".to_string(), // let OS choose available port
            grace_period_seconds: GracePeriod::testing(),
            allowed_origins: vec![DEFAULT_ALLOWED_ORIGIN.to_string()],
        }
    }

    /// Address handed to the listener, e.g. `0.0.0.0:8080`
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
