//! Multi-method router
//!
//! Creates one adapter per method on first use and routes every call for
//! an ID to the adapter that started it. The router keeps its own ID index,
//! so an ID can only be running under one method at a time.

use crate::adapter::{Adapter, AdapterFactory};
use crate::config::{BypassConfig, Method};
use crate::error::{Error, Result};
use crate::stats::BypassStats;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, warn};

type AdapterCtor = dyn Fn(Method) -> Arc<dyn Adapter> + Send + Sync;

/// Routes bypass lifecycle calls to per-method adapters
pub struct Router {
    factory: Box<AdapterCtor>,
    adapters: RwLock<HashMap<Method, Arc<dyn Adapter>>>,
    owners: DashMap<String, Method>,
}

impl Router {
    /// Router backed by [`AdapterFactory`]
    pub fn new() -> Self {
        Self::with_factory(AdapterFactory::create)
    }

    /// Router that builds adapters with `factory`
    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn(Method) -> Arc<dyn Adapter> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            adapters: RwLock::new(HashMap::new()),
            owners: DashMap::new(),
        }
    }

    /// Start `config` on the adapter for its method
    ///
    /// The ID's index slot stays locked until the adapter has started, so
    /// concurrent calls for the same ID wait and then see the outcome.
    pub fn start(&self, config: &BypassConfig) -> Result<()> {
        let adapter = self.adapter_for(config.method);

        let slot = match self.owners.entry(config.id.clone()) {
            Entry::Occupied(owner) => {
                return Err(Error::AlreadyRunning {
                    method: *owner.get(),
                    id: config.id.clone(),
                })
            }
            Entry::Vacant(slot) => slot,
        };

        adapter.start(config)?;
        slot.insert(config.method);
        Ok(())
    }

    /// Stop the session for `id`
    pub fn stop(&self, id: &str) -> Result<()> {
        let adapter = self.owner(id).ok_or_else(|| Error::not_found(id))?;
        match adapter.stop(id) {
            Ok(()) => {
                self.owners.remove(id);
                Ok(())
            }
            // Stale index entry; drop it so the ID can be reused
            Err(e @ Error::NotFound { .. }) => {
                self.owners.remove(id);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Counters for `id`, `None` if it is not running
    pub fn stats(&self, id: &str) -> Result<Option<BypassStats>> {
        match self.owner(id) {
            Some(adapter) => adapter.stats(id),
            None => Ok(None),
        }
    }

    /// Whether `id` is running under any method
    pub fn is_running(&self, id: &str) -> bool {
        self.owner(id).is_some_and(|adapter| adapter.is_running(id))
    }

    /// Listener address of `id`
    pub fn local_addr(&self, id: &str) -> Option<SocketAddr> {
        self.owner(id).and_then(|adapter| adapter.local_addr(id))
    }

    /// Method `id` is running under
    pub fn method_of(&self, id: &str) -> Option<Method> {
        self.owners.get(id).map(|owner| *owner)
    }

    /// IDs of every running session, sorted
    pub fn running_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.owners.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Methods an adapter has been created for
    pub fn methods(&self) -> Vec<Method> {
        let mut methods: Vec<Method> = self.adapters.read().keys().copied().collect();
        methods.sort();
        methods
    }

    /// Stop every running session, returning how many were stopped
    pub fn stop_all(&self) -> usize {
        let mut stopped = 0;
        for id in self.running_ids() {
            match self.stop(&id) {
                Ok(()) => stopped += 1,
                Err(e) => warn!(id = %id, error = %e, "Failed to stop bypass"),
            }
        }
        stopped
    }

    fn owner(&self, id: &str) -> Option<Arc<dyn Adapter>> {
        let method = self.method_of(id)?;
        self.adapters.read().get(&method).cloned()
    }

    fn adapter_for(&self, method: Method) -> Arc<dyn Adapter> {
        if let Some(adapter) = self.adapters.read().get(&method) {
            return Arc::clone(adapter);
        }

        let mut adapters = self.adapters.write();
        let adapter = adapters.entry(method).or_insert_with(|| {
            debug!(method = %method, "Creating adapter");
            (self.factory)(method)
        });
        Arc::clone(adapter)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
