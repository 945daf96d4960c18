//! Per-adapter session table

use crate::config::{BypassConfig, Method};
use crate::error::{Error, Result};
use crate::listener;
use crate::session::{Session, SessionParts};
use crate::stats::BypassStats;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::info;

/// Sessions started by one adapter, keyed by config ID
///
/// The table lock only guards membership. Counters live behind each
/// session's own lock, so reading stats never blocks a start or stop.
pub(crate) struct SessionRegistry {
    method: Method,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    pub(crate) fn new(method: Method) -> Self {
        Self {
            method,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Validate, bind and spawn a session for `config`
    ///
    /// `build` runs after the duplicate check and before the bind, so a
    /// rejected config never touches the network.
    pub(crate) fn launch<F>(&self, config: &BypassConfig, build: F) -> Result<()>
    where
        F: FnOnce(&BypassConfig) -> Result<SessionParts>,
    {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let mut sessions = self.sessions.write();
        if sessions.contains_key(&config.id) {
            return Err(Error::AlreadyRunning {
                method: self.method,
                id: config.id.clone(),
            });
        }

        let parts = build(config)?;
        let listener = listener::bind(config.local_port, &runtime)?;
        let session = Session::spawn(config, listener, parts, &runtime)?;

        info!(
            id = %config.id,
            method = %self.method,
            local_addr = %session.local_addr(),
            remote = %config.remote_addr(),
            "Bypass started"
        );
        sessions.insert(config.id.clone(), session);
        Ok(())
    }

    pub(crate) fn stop(&self, id: &str) -> Result<()> {
        let session = self
            .sessions
            .write()
            .remove(id)
            .ok_or_else(|| Error::not_found(id))?;

        session.stop();
        info!(id = %id, method = %self.method, "Bypass stopped");
        Ok(())
    }

    pub(crate) fn stats(&self, id: &str) -> Option<BypassStats> {
        self.get(id).map(|s| s.stats())
    }

    pub(crate) fn is_running(&self, id: &str) -> bool {
        self.sessions.read().contains_key(id)
    }

    pub(crate) fn local_addr(&self, id: &str) -> Option<SocketAddr> {
        self.get(id).map(|s| s.local_addr())
    }

    fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }
}

impl Drop for SessionRegistry {
    fn drop(&mut self) {
        for session in self.sessions.get_mut().values() {
            session.stop();
        }
    }
}
