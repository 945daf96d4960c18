//! V2Ray adapter
//!
//! A plain relay whose listener is wrapped in TLS when the config asks
//! for `encryption = "tls"`. Each session gets its own self-signed
//! certificate.

use super::{Adapter, SessionRegistry};
use crate::config::{BypassConfig, Method};
use crate::error::Result;
use crate::listener;
use crate::session::SessionParts;
use crate::stats::BypassStats;
use crate::transform::Passthrough;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

/// Plain relay over an optionally TLS-wrapped listener
pub struct V2rayAdapter {
    registry: SessionRegistry,
}

impl V2rayAdapter {
    /// Create an adapter with no running sessions
    pub fn new() -> Self {
        Self {
            registry: SessionRegistry::new(Method::V2ray),
        }
    }
}

impl Default for V2rayAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for V2rayAdapter {
    fn method(&self) -> Method {
        Method::V2ray
    }

    fn start(&self, config: &BypassConfig) -> Result<()> {
        self.registry.launch(config, |config| {
            let tls = if config.uses_tls() {
                debug!(id = %config.id, "Generating self-signed certificate");
                Some(listener::self_signed_acceptor()?)
            } else {
                None
            };
            Ok(SessionParts {
                transform: Arc::new(Passthrough),
                tls,
            })
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
