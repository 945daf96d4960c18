//! Error types for bypass-core
//!
//! Centralized error handling using `thiserror` for ergonomic error definitions.

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::Method;

/// Main error type for bypass-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// A handle with this ID is already registered
    #[error("{method} connection already running: {id}")]
    AlreadyRunning {
        /// Method of the adapter that rejected the start
        method: Method,
        /// Duplicate config ID
        id: String,
    },

    /// No handle with this ID is registered
    #[error("bypass connection not found: {id}")]
    NotFound {
        /// Requested config ID
        id: String,
    },

    /// Method string has no adapter
    #[error("unsupported bypass method: {0}")]
    UnsupportedMethod(String),

    /// Binding the local listener failed
    #[error("failed to create listener on {addr}: {source}")]
    Listen {
        /// Address we tried to bind
        addr: SocketAddr,
        /// Underlying socket error
        #[source]
        source: std::io::Error,
    },

    /// Self-signed certificate generation failed
    #[error("failed to generate certificate: {0}")]
    Certificate(String),

    /// TLS server setup failed
    #[error("failed to create TLS listener: {0}")]
    Tls(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path to the missing config file
        path: String,
    },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    ConfigValue {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    /// `start` was called outside of a Tokio runtime
    #[error("no Tokio runtime available to drive the relay")]
    NoRuntime,

    /// Dialing the remote endpoint failed
    #[error("failed to connect to remote {addr}: {reason}")]
    Dial {
        /// `host:port` we tried to reach
        addr: String,
        /// Failure reason
        reason: String,
    },

    /// Encryption or decryption failed
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Malformed obfuscation envelope
    #[error("Malformed frame: {message}")]
    Frame {
        /// Error message
        message: String,
        /// Offset in the buffer where parsing stopped
        offset: Option<usize>,
    },

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a config value error
    pub fn config_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValue {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a frame error
    pub fn frame(message: impl Into<String>) -> Self {
        Self::Frame {
            message: message.into(),
            offset: None,
        }
    }

    /// Create a frame error with offset
    pub fn frame_at(message: impl Into<String>, offset: usize) -> Self {
        Self::Frame {
            message: message.into(),
            offset: Some(offset),
        }
    }

    /// Create a not found error
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Whether this error was caused by caller input rather than the network
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::AlreadyRunning { .. }
                | Self::NotFound { .. }
                | Self::UnsupportedMethod(_)
                | Self::Config(_)
                | Self::ConfigValue { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::AlreadyRunning {
            method: Method::Obfs4,
            id: "cfg-1".to_string(),
        };
        assert_eq!(err.to_string(), "obfs4 connection already running: cfg-1");

        let err = Error::UnsupportedMethod("wireguard".to_string());
        assert!(err.to_string().contains("unsupported bypass method"));
        assert!(err.to_string().contains("wireguard"));
    }

    #[test]
    fn test_listen_error_message() {
        let err = Error::Listen {
            addr: "0.0.0.0:8080".parse().unwrap(),
            source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("failed to create listener"));
        assert!(msg.contains("0.0.0.0:8080"));
    }

    #[test]
    fn test_frame_error_with_offset() {
        let err = Error::frame_at("truncated header", 12);
        match err {
            Error::Frame { offset, .. } => assert_eq!(offset, Some(12)),
            _ => panic!("Wrong error type"),
        }
    }

    #[test]
    fn test_config_classification() {
        assert!(Error::not_found("x").is_config());
        assert!(Error::config_value("chaff_ratio", "negative").is_config());
        assert!(!Error::NoRuntime.is_config());
        assert!(!Error::Crypto("tag mismatch".into()).is_config());
    }
}
