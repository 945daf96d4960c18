//! Method to adapter mapping

use super::{Adapter, CustomAdapter, Obfs4Adapter, ShadowsocksAdapter, V2rayAdapter};
use crate::config::Method;
use crate::error::Result;
use std::sync::Arc;

/// Creates a fresh adapter for a method
pub struct AdapterFactory;

impl AdapterFactory {
    /// New adapter instance serving `method`
    pub fn create(method: Method) -> Arc<dyn Adapter> {
        match method {
            Method::Shadowsocks => Arc::new(ShadowsocksAdapter::new()),
            Method::Obfs4 => Arc::new(Obfs4Adapter::new()),
            Method::V2ray => Arc::new(V2rayAdapter::new()),
            Method::Custom
            | Method::HttpHeader
            | Method::TlsHandshake
            | Method::TcpFragment
            | Method::UdpFragment
            | Method::ProxyChain => Arc::new(CustomAdapter::for_method(method)),
        }
    }

    /// New adapter for a method name
    ///
    /// Fails with [`Error::UnsupportedMethod`](crate::Error::UnsupportedMethod)
    /// for unknown names.
    pub fn create_by_name(name: &str) -> Result<Arc<dyn Adapter>> {
        Ok(Self::create(name.parse()?))
    }
}
