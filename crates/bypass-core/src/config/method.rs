//! Bypass methods
//!
//! Each method names an obfuscation family served by one adapter type.
//! The fragment/handshake style aliases are all served by the custom
//! obfuscator.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Obfuscation method requested by a [`BypassConfig`](super::BypassConfig)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Plain relay, the reference adapter
    Shadowsocks,
    /// SHA-256 keystream XOR with inter-arrival-time pacing
    Obfs4,
    /// AES-256-GCM with chaff and fragment envelopes
    Custom,
    /// Plain relay over an optionally TLS-wrapped listener
    V2ray,
    /// Custom obfuscator, HTTP header flavour
    HttpHeader,
    /// Custom obfuscator, TLS handshake flavour
    TlsHandshake,
    /// Custom obfuscator, TCP fragment flavour
    TcpFragment,
    /// Custom obfuscator, UDP fragment flavour
    UdpFragment,
    /// Custom obfuscator, proxy chain flavour
    ProxyChain,
}

impl Method {
    /// Every known method
    pub const ALL: [Method; 9] = [
        Method::Shadowsocks,
        Method::Obfs4,
        Method::Custom,
        Method::V2ray,
        Method::HttpHeader,
        Method::TlsHandshake,
        Method::TcpFragment,
        Method::UdpFragment,
        Method::ProxyChain,
    ];

    /// Wire/config name of the method
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Shadowsocks => "shadowsocks",
            Method::Obfs4 => "obfs4",
            Method::Custom => "custom",
            Method::V2ray => "v2ray",
            Method::HttpHeader => "http_header",
            Method::TlsHandshake => "tls_handshake",
            Method::TcpFragment => "tcp_fragment",
            Method::UdpFragment => "udp_fragment",
            Method::ProxyChain => "proxy_chain",
        }
    }

    /// Whether the custom obfuscator serves this method
    pub fn is_custom_family(self) -> bool {
        matches!(
            self,
            Method::Custom
                | Method::HttpHeader
                | Method::TlsHandshake
                | Method::TcpFragment
                | Method::UdpFragment
                | Method::ProxyChain
        )
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Method::ALL
            .into_iter()
            .find(|m| m.as_str() == normalized)
            .ok_or_else(|| Error::UnsupportedMethod(s.to_string()))
    }
}
