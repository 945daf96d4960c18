//! Shadowsocks adapter
//!
//! Relays bytes unchanged. It is the baseline every other adapter is
//! measured against.

use super::{Adapter, SessionRegistry};
use crate::config::{BypassConfig, Method};
use crate::error::Result;
use crate::session::SessionParts;
use crate::stats::BypassStats;
use crate::transform::Passthrough;
use std::net::SocketAddr;
use std::sync::Arc;

/// Plain TCP relay
pub struct ShadowsocksAdapter {
    registry: SessionRegistry,
}

impl ShadowsocksAdapter {
    /// Create an adapter with no running sessions
    pub fn new() -> Self {
        Self {
            registry: SessionRegistry::new(Method::Shadowsocks),
        }
    }
}

impl Default for ShadowsocksAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for ShadowsocksAdapter {
    fn method(&self) -> Method {
        Method::Shadowsocks
    }

    fn start(&self, config: &BypassConfig) -> Result<()> {
        self.registry
            .launch(config, |_| Ok(SessionParts::plain(Arc::new(Passthrough))))
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
