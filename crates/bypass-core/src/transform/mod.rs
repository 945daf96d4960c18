//! Per-chunk payload transforms
//!
//! Every relay pushes each chunk it reads through a [`Transform`] before
//! writing it to the other side. Transforms are stateless apart from the
//! custom obfuscator's chaff counter, so one instance is shared by every
//! connection of a handle.

mod custom;
pub mod envelope;
mod obfs4;
mod passthrough;
pub mod timing;

pub use custom::{CustomObfuscator, ObfuscationMode};
pub use obfs4::{xor_keystream, Obfs4Transform};
pub use passthrough::Passthrough;

use crate::config::{BypassConfig, Method};
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;

/// Byte-level transform applied to every relayed chunk
pub trait Transform: Send + Sync {
    /// Get the transform name for logging/debugging
    fn name(&self) -> &'static str;

    /// Transform one chunk read from the relay source
    fn apply(&self, chunk: &[u8]) -> Result<Vec<u8>>;

    /// Delay to observe after writing a transformed chunk
    fn pacing(&self) -> Option<Duration> {
        None
    }
}

/// Builder for creating transforms from configuration
pub struct TransformBuilder;

impl TransformBuilder {
    /// Create the transform a bypass method relays with
    ///
    /// Malformed tunables are reported here, before anything is bound.
    pub fn from_config(config: &BypassConfig) -> Result<Arc<dyn Transform>> {
        let transform: Arc<dyn Transform> = match config.method {
            Method::Shadowsocks | Method::V2ray => Arc::new(Passthrough),
            Method::Obfs4 => Arc::new(Obfs4Transform::from_config(config)?),
            _ => Arc::new(CustomObfuscator::from_config(config)?),
        };
        Ok(transform)
    }
}
