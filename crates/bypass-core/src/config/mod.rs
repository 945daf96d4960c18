//! Configuration management
//!
//! [`BypassConfig`] describes one bypass instance handed to an adapter.
//! [`ServiceConfig`] is the TOML document a host process loads: logging,
//! runtime tuning and the list of bypasses to start.

mod method;

pub use method::Method;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

/// Descriptor of one bypass instance
///
/// Owned by the caller; adapters keep their own shared copy for the
/// lifetime of the running handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BypassConfig {
    /// Unique identifier, across all methods
    pub id: String,
    /// Human readable name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Obfuscation method
    pub method: Method,
    /// Local TCP port (0 = OS-assigned)
    #[serde(default)]
    pub local_port: u16,
    /// Remote host to relay to
    pub remote_host: String,
    /// Remote TCP port
    pub remote_port: u16,
    /// Shared secret the obfuscation keys are derived from
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    /// Transport encryption hint ("tls" or "none")
    #[serde(default = "default_encryption")]
    pub encryption: String,
    /// Method-specific tunables
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}

fn default_encryption() -> String {
    "none".to_string()
}

impl BypassConfig {
    /// Create a config with no password, no encryption and no parameters
    pub fn new(
        id: impl Into<String>,
        method: Method,
        local_port: u16,
        remote_host: impl Into<String>,
        remote_port: u16,
    ) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            method,
            local_port,
            remote_host: remote_host.into(),
            remote_port,
            password: String::new(),
            encryption: default_encryption(),
            parameters: BTreeMap::new(),
        }
    }

    /// Set the password
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Set the encryption hint
    #[must_use]
    pub fn with_encryption(mut self, encryption: impl Into<String>) -> Self {
        self.encryption = encryption.into();
        self
    }

    /// Set one tunable parameter
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// `host:port` of the remote endpoint, bracketing IPv6 literals
    pub fn remote_addr(&self) -> String {
        if self.remote_host.contains(':') && !self.remote_host.starts_with('[') {
            format!("[{}]:{}", self.remote_host, self.remote_port)
        } else {
            format!("{}:{}", self.remote_host, self.remote_port)
        }
    }

    /// Whether the listener should be TLS-wrapped
    pub fn uses_tls(&self) -> bool {
        self.encryption.eq_ignore_ascii_case("tls")
    }

    /// Read a typed parameter, falling back to `default` when absent
    pub fn param<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.parameters.get(key) {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| Error::config_value(key, format!("'{raw}': {e}"))),
        }
    }

    /// Validate the fields every adapter relies on
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::config_value("id", "must not be empty"));
        }
        if self.remote_host.trim().is_empty() {
            return Err(Error::config_value("remote_host", "must not be empty"));
        }
        if self.remote_port == 0 {
            return Err(Error::config_value("remote_port", "must be between 1 and 65535"));
        }
        Ok(())
    }
}

/// Top-level configuration for a host process
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Runtime tuning
    pub runtime: RuntimeConfig,
    /// Bypass instances to start
    #[serde(rename = "bypass", skip_serializing_if = "Vec::is_empty")]
    pub bypasses: Vec<BypassConfig>,
}

impl ServiceConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| Error::ConfigNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(Error::from)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Validate every bypass entry and cross-entry uniqueness
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        let mut ports = HashSet::new();

        for bypass in &self.bypasses {
            bypass.validate()?;

            if !ids.insert(bypass.id.as_str()) {
                return Err(Error::config_value(
                    "bypass.id",
                    format!("duplicate id '{}'", bypass.id),
                ));
            }

            if bypass.local_port != 0 && !ports.insert(bypass.local_port) {
                return Err(Error::config_value(
                    "bypass.local_port",
                    format!("port {} used by more than one bypass", bypass.local_port),
                ));
            }
        }

        if self.runtime.stats_interval_secs == 0 {
            return Err(Error::config_value(
                "runtime.stats_interval_secs",
                "must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Sample configuration with one bypass per adapter family
    pub fn example() -> Self {
        Self {
            bypasses: vec![
                BypassConfig::new("ss-local", Method::Shadowsocks, 1080, "127.0.0.1", 8388),
                BypassConfig::new("obfs4-edge", Method::Obfs4, 1081, "203.0.113.10", 443)
                    .with_password("change-me")
                    .with_parameter("iat_dist", "pareto")
                    .with_parameter("iat_dist_min", "10")
                    .with_parameter("iat_dist_max", "100"),
                BypassConfig::new("custom-hybrid", Method::Custom, 1082, "203.0.113.11", 443)
                    .with_password("change-me")
                    .with_parameter("obfuscation_mode", "hybrid")
                    .with_parameter("chaff_ratio", "0.3")
                    .with_parameter("fragment_size", "1024"),
                BypassConfig::new("v2ray-tls", Method::V2ray, 1443, "203.0.113.12", 10086)
                    .with_encryption("tls"),
            ],
            ..Self::default()
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log file path (None = stdout only)
    pub file: Option<String>,
    /// Enable JSON format logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            json_format: false,
        }
    }
}

/// Runtime tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Seconds between periodic stats reports
    pub stats_interval_secs: u64,
    /// Number of worker threads (0 = auto)
    pub worker_threads: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stats_interval_secs: 60,
            worker_threads: 0,
        }
    }
}
