//! Local listener setup
//!
//! Listeners are bound synchronously with `socket2` so `start` can report
//! bind failures to its caller before any task is spawned.

use crate::error::{Error, Result};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::runtime::Handle;
use tokio_rustls::TlsAcceptor;
use tracing::debug;

/// Pending connection backlog
const BACKLOG: i32 = 1024;

/// Hostnames the self-signed certificate is issued for
const SELF_SIGNED_NAMES: [&str; 2] = ["localhost", "127.0.0.1"];

/// Bind `0.0.0.0:port` (IPv4 only) and register the socket with `runtime`
pub fn bind(port: u16, runtime: &Handle) -> Result<TcpListener> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let listen_err = |source| Error::Listen { addr, source };

    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP)).map_err(listen_err)?;
    #[cfg(unix)]
    socket.set_reuse_address(true).map_err(listen_err)?;
    socket.set_nonblocking(true).map_err(listen_err)?;
    socket.bind(&addr.into()).map_err(listen_err)?;
    socket.listen(BACKLOG).map_err(listen_err)?;

    let _guard = runtime.enter();
    let listener = TcpListener::from_std(socket.into()).map_err(listen_err)?;
    debug!(addr = %addr, "Listener bound");
    Ok(listener)
}

/// TLS acceptor backed by a freshly generated self-signed certificate
pub fn self_signed_acceptor() -> Result<TlsAcceptor> {
    let names: Vec<String> = SELF_SIGNED_NAMES.iter().map(|s| s.to_string()).collect();
    let cert = rcgen::generate_simple_self_signed(names)
        .map_err(|e| Error::Certificate(e.to_string()))?;
    let cert_der = cert
        .serialize_der()
        .map_err(|e| Error::Certificate(e.to_string()))?;
    let key_der = cert.serialize_private_key_der();

    let config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(
            vec![CertificateDer::from(cert_der)],
            PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_der)),
        )
        .map_err(|e| Error::Tls(e.to_string()))?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}
