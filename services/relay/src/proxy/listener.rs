//! TCP listener and connection handling.
//!
//! Accepts connections, dials the upstream, inspects the first TLS record,
//! then relays or drops. Everything TLS-shaped that cannot be fingerprinted
//! and matched against the allow-set is dropped before a single byte
//! reaches the upstream; traffic that is definitively not TLS passes
//! through untouched.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn, Instrument};

use crate::config::Config;

use super::forward;
use super::gate::{self, GateDecision};
use super::lookahead::Lookahead;
use super::sniff::{sniff_client_hello, SniffResult};

/// Statistics for a relay listener.
#[derive(Debug, Default)]
pub struct RelayStats {
    /// Total connections accepted.
    pub connections_accepted: AtomicU64,
    /// Connections currently being handled.
    pub connections_active: AtomicU64,
    /// TLS connections admitted by fingerprint.
    pub tls_admitted: AtomicU64,
    /// TLS connections denied by fingerprint.
    pub tls_denied: AtomicU64,
    /// Non-TLS connections passed through.
    pub non_tls_passthrough: AtomicU64,
    /// Connections dropped for malformed or unparseable handshakes.
    pub malformed_dropped: AtomicU64,
    /// Upstream dial failures.
    pub dial_failures: AtomicU64,
    /// Bytes relayed client to upstream.
    pub bytes_to_upstream: AtomicU64,
    /// Bytes relayed upstream to client.
    pub bytes_to_client: AtomicU64,
}

/// The gate itself: one listening socket, one upstream target.
pub struct Relay {
    config: Arc<Config>,
    listener: TcpListener,
    stats: Arc<RelayStats>,
}

impl Relay {
    /// Binds the listening socket. A bind failure here is fatal to the
    /// service; there is nothing to serve without it.
    pub async fn bind(config: Arc<Config>) -> io::Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).await?;
        let local_addr = listener.local_addr()?;

        info!(
            listen_addr = %local_addr,
            target = %config.target_addr,
            "Relay bound"
        );

        Ok(Self {
            config,
            listener,
            stats: Arc::new(RelayStats::default()),
        })
    }

    /// Get the local address this relay is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Get relay statistics.
    pub fn stats(&self) -> Arc<RelayStats> {
        Arc::clone(&self.stats)
    }

    /// Runs the accept loop. Each connection is handled on its own task;
    /// accept failures are logged and the loop keeps accepting. There is
    /// no cap on concurrent handlers.
    pub async fn run(self: Arc<Self>) -> io::Result<()> {
        let local_addr = self.listener.local_addr()?;
        info!(listen_addr = %local_addr, "Relay started");

        loop {
            match self.listener.accept().await {
                Ok((client, peer_addr)) => {
                    self.stats
                        .connections_accepted
                        .fetch_add(1, Ordering::Relaxed);
                    self.stats.connections_active.fetch_add(1, Ordering::Relaxed);

                    let relay = Arc::clone(&self);
                    let stats = Arc::clone(&self.stats);

                    tokio::spawn(
                        async move {
                            if let Err(e) = relay.handle_connection(client).await {
                                debug!(error = %e, "Connection error");
                            }
                            stats.connections_active.fetch_sub(1, Ordering::Relaxed);
                        }
                        .instrument(tracing::info_span!("connection", peer = %peer_addr)),
                    );
                }
                Err(e) => {
                    error!(error = %e, "Accept error");
                    // Brief sleep to avoid a tight loop on persistent errors
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }

    /// Handles one connection end to end. Both sockets are owned here and
    /// close on every return path.
    async fn handle_connection(&self, client: TcpStream) -> io::Result<()> {
        // The upstream is dialed before any client byte is examined, so a
        // dial failure drops the connection with nothing read or sent.
        let mut upstream = match self.dial_upstream().await {
            Ok(stream) => stream,
            Err(e) => {
                self.stats.dial_failures.fetch_add(1, Ordering::Relaxed);
                warn!(target = %self.config.target_addr, error = %e, "Upstream dial failed");
                return Ok(());
            }
        };

        let mut lookahead = Lookahead::new(client);

        match sniff_client_hello(&mut lookahead).await? {
            SniffResult::NotTls => {
                self.stats
                    .non_tls_passthrough
                    .fetch_add(1, Ordering::Relaxed);
                debug!("Not TLS, passing through");
            }
            SniffResult::Malformed { reason } => {
                self.stats.malformed_dropped.fetch_add(1, Ordering::Relaxed);
                warn!(reason = reason, "Malformed TLS handshake, dropping");
                return Ok(());
            }
            SniffResult::ClientHello(record) => {
                match gate::evaluate(&record, &self.config.allow_ja4) {
                    Ok(GateDecision::Admitted { fingerprint }) => {
                        self.stats.tls_admitted.fetch_add(1, Ordering::Relaxed);
                        info!(fingerprint = %fingerprint, "JA4 admitted");
                    }
                    Ok(GateDecision::Denied { fingerprint }) => {
                        self.stats.tls_denied.fetch_add(1, Ordering::Relaxed);
                        warn!(fingerprint = %fingerprint, "JA4 blocked");
                        return Ok(());
                    }
                    Err(e) => {
                        self.stats.malformed_dropped.fetch_add(1, Ordering::Relaxed);
                        warn!(error = %e, "ClientHello parse failed, dropping");
                        return Ok(());
                    }
                }
            }
        }

        // Forwarding starts from offset zero of the client stream: the
        // peeked bytes are replayed to the upstream first.
        let (buffered, mut client) = lookahead.into_parts();
        let (to_upstream, to_client) =
            forward::relay(&mut client, &mut upstream, &buffered).await?;

        self.stats
            .bytes_to_upstream
            .fetch_add(to_upstream, Ordering::Relaxed);
        self.stats
            .bytes_to_client
            .fetch_add(to_client, Ordering::Relaxed);

        debug!(
            bytes_to_upstream = to_upstream,
            bytes_to_client = to_client,
            "Session closed"
        );

        Ok(())
    }

    /// Dials the configured upstream with the configured timeout.
    async fn dial_upstream(&self) -> io::Result<TcpStream> {
        match tokio::time::timeout(
            self.config.dial_timeout,
            TcpStream::connect(&self.config.target_addr),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "upstream dial timeout",
            )),
        }
    }
}
