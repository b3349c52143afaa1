//! # Configuration Module
//!
//! Handles loading and validating the optional TOML tuning file, and reading
//! the remote endpoint from the environment.
//!
//! The endpoint is mandatory and comes from `JETSON_IP` / `JETSON_PORT`,
//! either set in the process environment or listed in a `.env` file in the
//! working directory. Process variables win over the file.
//! Everything in the TOML file has a default, so an empty (or absent) file
//! yields a working configuration.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::error::{BridgeError, Result};

/// Environment variable holding the remote host
pub const HOST_ENV_VAR: &str = "JETSON_IP";

/// Environment variable holding the remote port
pub const PORT_ENV_VAR: &str = "JETSON_PORT";

/// Optional file supplying endpoint variables not set in the environment
pub const DOTENV_FILE: &str = ".env";

/// Environment variable pointing at an optional TOML tuning file
pub const CONFIG_ENV_VAR: &str = "BRIDGE_CONFIG";

/// Largest axis vector the bridge will stream
pub const MAX_AXIS_COUNT: usize = 8;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Driver loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct BridgeConfig {
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,

    #[serde(default = "default_start_enabled")]
    pub start_enabled: bool,

    /// `false` selects the always-on variant: no toggle, no feed.
    #[serde(default = "default_feed_enabled")]
    pub feed_enabled: bool,
}

/// Packet feed configuration
#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

/// Controller configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ControllerConfig {
    #[serde(default)]
    pub device_path: String,

    #[serde(default = "default_axis_count")]
    pub axis_count: usize,

    #[serde(default = "default_max_read_failures")]
    pub max_read_failures: u32,
}

/// Network configuration
#[derive(Debug, Deserialize, Clone)]
pub struct NetworkConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files; empty disables file logging.
    #[serde(default)]
    pub log_dir: String,
}

// Default value functions
fn default_period_ms() -> u64 { 250 }
fn default_start_enabled() -> bool { false }
fn default_feed_enabled() -> bool { true }

fn default_max_items() -> usize { 10 }

fn default_axis_count() -> usize { 2 }
fn default_max_read_failures() -> u32 { 40 }

fn default_bind_addr() -> String { "0.0.0.0:0".to_string() }
fn default_max_payload_bytes() -> usize { 1200 }

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
            start_enabled: default_start_enabled(),
            feed_enabled: default_feed_enabled(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self { max_items: default_max_items() }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            device_path: String::new(),
            axis_count: default_axis_count(),
            max_read_failures: default_max_read_failures(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

impl BridgeConfig {
    /// Loop period as a [`Duration`]
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use gamepad_udp_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.bridge.period_ms == 0 || self.bridge.period_ms > 10000 {
            return Err(BridgeError::Config(
                "period_ms must be between 1 and 10000".to_string(),
            ));
        }

        if self.feed.max_items == 0 {
            return Err(BridgeError::Config(
                "feed max_items must be greater than 0".to_string(),
            ));
        }

        if self.controller.axis_count == 0 || self.controller.axis_count > MAX_AXIS_COUNT {
            return Err(BridgeError::Config(format!(
                "axis_count must be between 1 and {}",
                MAX_AXIS_COUNT
            )));
        }

        if self.controller.max_read_failures == 0 {
            return Err(BridgeError::Config(
                "max_read_failures must be greater than 0".to_string(),
            ));
        }

        if self.network.bind_addr.parse::<SocketAddr>().is_err() {
            return Err(BridgeError::Config(format!(
                "bind_addr '{}' is not a valid socket address",
                self.network.bind_addr
            )));
        }

        // A JSON array of MAX_AXIS_COUNT values rounded to 2dp stays well under 64 bytes
        if self.network.max_payload_bytes < 64 || self.network.max_payload_bytes > 65507 {
            return Err(BridgeError::Config(
                "max_payload_bytes must be between 64 and 65507".to_string(),
            ));
        }

        Ok(())
    }
}

/// Remote endpoint the datagrams are addressed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Read the endpoint from `JETSON_IP` / `JETSON_PORT`, falling back to `.env`
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Endpoint`] if either variable is missing or invalid,
    /// or [`BridgeError::Config`] if `.env` exists but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with_file(DOTENV_FILE)
    }

    /// Like [`Endpoint::from_env`] with an explicit dotenv path
    pub fn from_env_with_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file_vars = read_dotenv(path.as_ref())?;
        Self::from_lookup(layered(|key| std::env::var(key).ok(), &file_vars))
    }

    /// Build the endpoint from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup(HOST_ENV_VAR)
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .ok_or_else(|| BridgeError::Endpoint(format!("{} is not set", HOST_ENV_VAR)))?;

        let raw_port = lookup(PORT_ENV_VAR)
            .ok_or_else(|| BridgeError::Endpoint(format!("{} is not set", PORT_ENV_VAR)))?;

        let port = raw_port
            .trim()
            .parse::<u16>()
            .ok()
            .filter(|&p| p != 0)
            .ok_or_else(|| {
                BridgeError::Endpoint(format!(
                    "{} must be an integer between 1 and 65535, got '{}'",
                    PORT_ENV_VAR, raw_port
                ))
            })?;

        Ok(Self { host, port })
    }

    /// Resolve the endpoint to a socket address, preferring IPv4
    ///
    /// Called once at startup; the result is reused for every send.
    pub async fn resolve(&self) -> Result<SocketAddr> {
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| BridgeError::Endpoint(format!("Failed to resolve {}: {}", self, e)))?
            .collect();

        addrs
            .iter()
            .find(|a| a.is_ipv4())
            .or_else(|| addrs.first())
            .copied()
            .ok_or_else(|| BridgeError::Endpoint(format!("{} resolved to no addresses", self)))
    }
}

/// Parse a dotenv file into a map; a missing file yields an empty map
pub fn read_dotenv(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let vars = dotenvy::from_path_iter(path)
        .and_then(|iter| iter.collect::<std::result::Result<HashMap<_, _>, _>>())
        .map_err(|e| BridgeError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    tracing::debug!("Loaded {} variables from {}", vars.len(), path.display());
    Ok(vars)
}

/// Lookup that consults `primary` first, then the dotenv variables
fn layered<'a, F>(
    primary: F,
    file_vars: &'a HashMap<String, String>,
) -> impl Fn(&str) -> Option<String> + 'a
where
    F: Fn(&str) -> Option<String> + 'a,
{
    move |key| primary(key).or_else(|| file_vars.get(key).cloned())
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
