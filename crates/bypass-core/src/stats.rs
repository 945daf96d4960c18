//! Per-handle relay statistics
//!
//! Every running handle owns one [`StatsCell`]. Its lock is separate from
//! the adapter's registry lock, so relay progress on one handle never waits
//! on start/stop of another.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Relay direction for byte accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Client to remote, counted as received
    Upstream,
    /// Remote to client, counted as transmitted
    Downstream,
}

impl Direction {
    /// Short label for logs
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Upstream => "upstream",
            Direction::Downstream => "downstream",
        }
    }

    /// `(rx, tx)` increments for `len` bytes moved in this direction
    pub fn split(self, len: u64) -> (u64, u64) {
        match self {
            Direction::Upstream => (len, 0),
            Direction::Downstream => (0, len),
        }
    }
}

/// Snapshot of a handle's counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BypassStats {
    /// Config ID the counters belong to
    pub id: String,
    /// Bytes read from clients
    pub bytes_rx: u64,
    /// Bytes read from the remote and sent back to clients
    pub bytes_tx: u64,
    /// Accepted client connections
    pub connections: u64,
    /// Accept, dial and relay failures
    pub error_count: u64,
    /// Last time a chunk was relayed
    pub last_activity: SystemTime,
}

impl BypassStats {
    /// Fresh counters for `id`
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            bytes_rx: 0,
            bytes_tx: 0,
            connections: 0,
            error_count: 0,
            last_activity: SystemTime::now(),
        }
    }
}

/// Mutex-guarded stats owned by one handle
#[derive(Debug)]
pub struct StatsCell {
    inner: Mutex<BypassStats>,
}

impl StatsCell {
    /// Create counters for `id`
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(BypassStats::new(id)),
        }
    }

    /// Add to the byte counters
    pub fn add_bytes(&self, rx: u64, tx: u64) {
        let mut stats = self.inner.lock();
        stats.bytes_rx += rx;
        stats.bytes_tx += tx;
    }

    /// Refresh `last_activity`
    pub fn touch(&self) {
        self.inner.lock().last_activity = SystemTime::now();
    }

    /// Count an accepted client
    pub fn increment_connections(&self) {
        self.inner.lock().connections += 1;
    }

    /// Count a runtime failure
    pub fn increment_errors(&self) {
        self.inner.lock().error_count += 1;
    }

    /// Copy of the current counters
    pub fn snapshot(&self) -> BypassStats {
        self.inner.lock().clone()
    }
}
