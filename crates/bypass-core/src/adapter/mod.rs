//! Bypass adapters
//!
//! Each adapter serves one obfuscation family and owns the sessions it
//! started, keyed by config ID. Adapters share the session engine and
//! differ only in the transform and listener they build.

mod custom;
mod factory;
mod obfs4;
mod registry;
mod shadowsocks;
mod v2ray;

pub use custom::CustomAdapter;
pub use factory::AdapterFactory;
pub use obfs4::Obfs4Adapter;
pub use shadowsocks::ShadowsocksAdapter;
pub use v2ray::V2rayAdapter;

pub(crate) use registry::SessionRegistry;

use crate::config::{BypassConfig, Method};
use crate::error::Result;
use crate::stats::BypassStats;
use std::net::SocketAddr;

/// Lifecycle contract shared by every bypass method
///
/// `start` binds before returning, so listen failures reach the caller.
/// Everything after that (accept, dial and relay failures) is logged and
/// counted in the session's stats instead.
#[cfg_attr(test, mockall::automock)]
pub trait Adapter: Send + Sync {
    /// Method this adapter serves
    fn method(&self) -> Method;

    /// Bind the local listener and start relaying for `config`
    ///
    /// Must be called from within a Tokio runtime.
    fn start(&self, config: &BypassConfig) -> Result<()>;

    /// Stop the session for `id`, closing its listener and relays
    fn stop(&self, id: &str) -> Result<()>;

    /// Counters of the session for `id`, `None` if it is not running
    fn stats(&self, id: &str) -> Result<Option<BypassStats>>;

    /// Whether a session for `id` is running
    fn is_running(&self, id: &str) -> bool;

    /// Bound listener address of the session for `id`
    fn local_addr(&self, id: &str) -> Option<SocketAddr>;
}
