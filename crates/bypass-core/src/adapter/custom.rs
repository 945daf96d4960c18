//! Custom obfuscation adapter
//!
//! Serves `custom` and its aliases (`http_header`, `tls_handshake`,
//! `tcp_fragment`, `udp_fragment`, `proxy_chain`).

use super::{Adapter, SessionRegistry};
use crate::config::{BypassConfig, Method};
use crate::error::Result;
use crate::session::SessionParts;
use crate::stats::BypassStats;
use crate::transform::CustomObfuscator;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

/// AEAD relay with chaff and fragment envelopes
pub struct CustomAdapter {
    method: Method,
    registry: SessionRegistry,
}

impl CustomAdapter {
    /// Create an adapter for the `custom` method
    pub fn new() -> Self {
        Self::for_method(Method::Custom)
    }

    /// Create an adapter reporting `method`, one of the custom family
    pub fn for_method(method: Method) -> Self {
        debug_assert!(method.is_custom_family());
        Self {
            method,
            registry: SessionRegistry::new(method),
        }
    }
}

impl Default for CustomAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for CustomAdapter {
    fn method(&self) -> Method {
        self.method
    }

    fn start(&self, config: &BypassConfig) -> Result<()> {
        self.registry.launch(config, |config| {
            let obfuscator = CustomObfuscator::from_config(config)?;
            debug!(id = %config.id, obfuscator = ?obfuscator, "Custom obfuscator ready");
            Ok(SessionParts::plain(Arc::new(obfuscator)))
        })
    }

    fn stop(&self, id: &str) -> Result<()> {
        self.registry.stop(id)
    }

    fn stats(&self, id: &str) -> Result<Option<BypassStats>> {
        Ok(self.registry.stats(id))
    }

    fn is_running(&self, id: &str) -> bool {
        self.registry.is_running(id)
    }

    fn local_addr(&self, id: &str) -> Option<SocketAddr> {
        self.registry.local_addr(id)
    }
}
