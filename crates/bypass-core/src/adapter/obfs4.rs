//! Obfs4 adapter

use super::{Adapter, SessionRegistry};
use crate::config::{BypassConfig, Method};
use crate::error::Result;
use crate::session::SessionParts;
use crate::stats::BypassStats;
use crate::transform::Obfs4Transform;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

/// Keystream relay with inter-arrival-time pacing
pub struct Obfs4Adapter {
    registry: SessionRegistry,
}

impl Obfs4Adapter {
    /// Create an adapter with no running sessions
    pub fn new() -> Self {
        Self {
            registry: SessionRegistry::new(Method::Obfs4),
        }
    }
}

impl Default for Obfs4Adapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for Obfs4Adapter {
    fn method(&self) -> Method {
        Method::Obfs4
    }

    fn start(&self, config: &BypassConfig) -> Result<()> {
        self.registry.launch(config, |config| {
            let transform = Obfs4Transform::from_config(config)?;
            debug!(
                id = %config.id,
                iat_mode = transform.iat().is_some(),
                iat_dist = ?transform.iat().map(|iat| iat.distribution()),
                "Obfs4 transform ready"
            );
            Ok(SessionParts::plain(Arc::new(transform)))
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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_tunables_leave_nothing_behind() {
        let adapter = Obfs4Adapter::new();
        let config = BypassConfig::new("o4", Method::Obfs4, 0, "127.0.0.1", 443)
            .with_parameter("iat_dist_max", "soon");

        assert!(adapter.start(&config).unwrap_err().is_config());
        assert!(!adapter.is_running("o4"));
    }
}
