//! Running bypass handles
//!
//! A [`Session`] is what an adapter keeps per config ID: the accept loop,
//! the relays it spawns and their shared counters. Every task observes the
//! session's cancellation token, so stopping a session tears down all
//! in-flight relays without waiting for I/O timeouts. The listener itself
//! is owned by the session and closed by [`Session::stop`] before it
//! returns.

use crate::config::BypassConfig;
use crate::error::{Error, Result};
use crate::stats::{BypassStats, Direction, StatsCell};
use crate::transform::Transform;
use parking_lot::Mutex;
use std::future::poll_fn;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::task::Poll;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Handle;
use tokio::time::{sleep, timeout};
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};

/// Maximum chunk read from either side of a relay
pub const CHUNK_SIZE: usize = 4096;

/// Timeout for dialing the remote endpoint
pub const DIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-operation read/write timeout inside a relay
pub const IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for the server side of a TLS handshake
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause after a failed accept so a persistent error cannot spin the loop
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Components a session relays with
pub struct SessionParts {
    /// Transform applied to every chunk
    pub transform: Arc<dyn Transform>,
    /// TLS acceptor wrapping client connections
    pub tls: Option<TlsAcceptor>,
}

impl SessionParts {
    /// Plain TCP with the given transform
    pub fn plain(transform: Arc<dyn Transform>) -> Self {
        Self {
            transform,
            tls: None,
        }
    }
}

/// One running bypass handle
pub struct Session {
    config: Arc<BypassConfig>,
    local_addr: SocketAddr,
    /// `None` once stopped
    listener: Mutex<Option<TcpListener>>,
    cancel: CancellationToken,
    stats: Arc<StatsCell>,
    transform: Arc<dyn Transform>,
    tls: Option<TlsAcceptor>,
}

impl Session {
    /// Start accepting on `listener`
    pub fn spawn(
        config: &BypassConfig,
        listener: TcpListener,
        parts: SessionParts,
        runtime: &Handle,
    ) -> Result<Arc<Self>> {
        let local_addr = listener.local_addr()?;
        let session = Arc::new(Self {
            config: Arc::new(config.clone()),
            local_addr,
            listener: Mutex::new(Some(listener)),
            cancel: CancellationToken::new(),
            stats: Arc::new(StatsCell::new(&config.id)),
            transform: parts.transform,
            tls: parts.tls,
        });

        runtime.spawn(Arc::clone(&session).accept_loop());
        Ok(session)
    }

    /// Config this session was started with
    pub fn config(&self) -> &BypassConfig {
        &self.config
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Copy of the counters
    pub fn stats(&self) -> BypassStats {
        self.stats.snapshot()
    }

    /// Whether [`stop`](Self::stop) has been called
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel the accept loop and every relay, and close the listener
    ///
    /// The port is released and new connections are refused once this
    /// returns.
    pub fn stop(&self) {
        self.cancel.cancel();
        drop(self.listener.lock().take());
    }

    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        poll_fn(|cx| match self.listener.lock().as_ref() {
            Some(listener) => listener.poll_accept(cx),
            None => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "listener closed",
            ))),
        })
        .await
    }

    async fn accept_loop(self: Arc<Self>) {
        info!(
            id = %self.config.id,
            method = %self.config.method,
            addr = %self.local_addr,
            transform = self.transform.name(),
            "Accepting connections"
        );

        loop {
            let accepted = tokio::select! {
                _ = self.cancel.cancelled() => break,
                accepted = self.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => {
                    let session = Arc::clone(&self);
                    tokio::spawn(async move { session.serve_client(stream, peer).await });
                }
                Err(e) => {
                    if self.cancel.is_cancelled() {
                        break;
                    }
                    error!(id = %self.config.id, error = %e, "Failed to accept connection");
                    self.stats.increment_errors();
                    sleep(ACCEPT_BACKOFF).await;
                }
            }
        }

        debug!(id = %self.config.id, "Accept loop exited");
    }

    #[instrument(skip_all, fields(id = %self.config.id, peer = %peer))]
    async fn serve_client(self: Arc<Self>, stream: TcpStream, peer: SocketAddr) {
        self.stats.increment_connections();
        if let Err(e) = stream.set_nodelay(true) {
            trace!(error = %e, "Failed to set TCP_NODELAY");
        }

        let outcome = tokio::select! {
            _ = self.cancel.cancelled() => Ok(()),
            outcome = self.handle_client(stream) => outcome,
        };

        match outcome {
            Ok(()) => debug!("Relay finished"),
            Err(e) => {
                warn!(error = %e, "Relay failed");
                self.stats.increment_errors();
            }
        }
    }

    async fn handle_client(&self, stream: TcpStream) -> Result<()> {
        match &self.tls {
            Some(acceptor) => {
                let tls = timeout(HANDSHAKE_TIMEOUT, acceptor.accept(stream))
                    .await
                    .map_err(|_| timed_out("TLS handshake"))??;
                let remote = self.dial().await?;
                self.relay(tls, remote).await
            }
            None => {
                let remote = self.dial().await?;
                self.relay(stream, remote).await
            }
        }
    }

    async fn dial(&self) -> Result<TcpStream> {
        let addr = self.config.remote_addr();
        let dial_err = |reason: String| Error::Dial {
            addr: addr.clone(),
            reason,
        };

        let stream = timeout(DIAL_TIMEOUT, TcpStream::connect(addr.as_str()))
            .await
            .map_err(|_| dial_err(format!("timed out after {}s", DIAL_TIMEOUT.as_secs())))?
            .map_err(|e| dial_err(e.to_string()))?;

        debug!(remote = %addr, "Connected to remote");
        Ok(stream)
    }

    async fn relay<S>(&self, client: S, remote: TcpStream) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (mut client_rd, mut client_wr) = tokio::io::split(client);
        let (mut remote_rd, mut remote_wr) = remote.into_split();

        let (direction, result) = tokio::select! {
            r = self.pump(&mut client_rd, &mut remote_wr, Direction::Upstream) => (Direction::Upstream, r),
            r = self.pump(&mut remote_rd, &mut client_wr, Direction::Downstream) => (Direction::Downstream, r),
        };

        let total = result?;
        debug!(direction = direction.as_str(), bytes = total, "Relay direction closed");
        Ok(())
    }

    /// Copy chunks from `src` to `dst` until EOF, transforming each one
    async fn pump<R, W>(&self, src: &mut R, dst: &mut W, direction: Direction) -> Result<u64>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut total = 0u64;

        loop {
            let n = timeout(IO_TIMEOUT, src.read(&mut buf))
                .await
                .map_err(|_| timed_out("read"))??;
            if n == 0 {
                return Ok(total);
            }

            let out = self.transform.apply(&buf[..n])?;
            timeout(IO_TIMEOUT, dst.write_all(&out))
                .await
                .map_err(|_| timed_out("write"))??;

            total += n as u64;
            let (rx, tx) = direction.split(n as u64);
            self.stats.add_bytes(rx, tx);
            self.stats.touch();
            trace!(direction = direction.as_str(), read = n, written = out.len(), "Chunk relayed");

            if let Some(delay) = self.transform.pacing() {
                sleep(delay).await;
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.config.id)
            .field("local_addr", &self.local_addr)
            .field("transform", &self.transform.name())
            .field("tls", &self.tls.is_some())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

fn timed_out(what: &str) -> Error {
    Error::Io(io::Error::new(
        io::ErrorKind::TimedOut,
        format!("{what} timed out"),
    ))
}
