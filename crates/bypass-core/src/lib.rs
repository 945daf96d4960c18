//! # Bypass Core
//!
//! Obfuscating TCP relays for Deep Packet Inspection circumvention.
//!
//! ## Architecture
//!
//! This crate provides:
//! - **Adapters** - One per obfuscation family, each owning its running sessions
//! - **Transforms** - Per-chunk byte codecs (passthrough, keystream, AEAD envelopes)
//! - **Sessions** - Accept loop and bidirectional relays with shared stats
//! - **Router** - Lazily created adapters behind a single ID-keyed entry point
//! - **Configuration** - Bypass descriptors and the TOML service file
//!
//! ## Example
//!
//! ```rust,no_run
//! use bypass_core::{BypassConfig, Method, Router};
//!
//! # async fn run() -> bypass_core::Result<()> {
//! let router = Router::new();
//! let config = BypassConfig::new("edge-1", Method::Obfs4, 1081, "203.0.113.10", 443)
//!     .with_password("secret");
//!
//! router.start(&config)?;
//! if let Some(stats) = router.stats("edge-1")? {
//!     println!("{} bytes received", stats.bytes_rx);
//! }
//! router.stop("edge-1")?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]

pub mod adapter;
pub mod config;
pub mod crypto;
pub mod error;
pub mod listener;
pub mod router;
pub mod session;
pub mod stats;
pub mod transform;

// Re-exports for convenience
pub use adapter::{Adapter, AdapterFactory};
pub use config::{BypassConfig, Method, ServiceConfig};
pub use error::{Error, Result};
pub use router::Router;
pub use stats::BypassStats;
pub use transform::{Transform, TransformBuilder};
