//! Full connect prober.
//!
//! Asks the operating system's socket API to reach the port. For TCP this
//! completes the three-way handshake, so it is reliable but easy to log on
//! the remote side. For UDP there is no handshake: the socket is only
//! associated with the destination, and a port counts as open whenever the
//! kernel reports no immediate error. That is a weak signal and most
//! unreachable UDP ports will still show up as open.

use crate::scanner::traits::{ProbeOutcome, ProbeStatus, Prober, Protocol, Strategy};
use crate::types::{system_resolver, Host, Port};
use async_trait::async_trait;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::OnceCell;
use tokio::time::{timeout_at, Instant};
use tracing::debug;
use trust_dns_resolver::TokioAsyncResolver;

/// Full connect prober.
///
/// Does not require elevated privileges.
pub struct ConnectProber {
    host: Host,
    protocol: Protocol,
    timeout: Duration,
    /// Built on the first probe of a hostname and shared by the rest.
    resolver: OnceCell<TokioAsyncResolver>,
}

impl ConnectProber {
    /// Create a new connect prober.
    ///
    /// # Arguments
    /// * `host` - Target host, resolved again on every probe
    /// * `protocol` - TCP handshake or UDP association
    /// * `timeout` - Upper bound for one probe, resolution included
    pub fn new(host: Host, protocol: Protocol, timeout: Duration) -> Self {
        Self {
            host,
            protocol,
            timeout,
            resolver: OnceCell::new(),
        }
    }

    async fn resolver(&self) -> &TokioAsyncResolver {
        self.resolver.get_or_init(|| async { system_resolver() }).await
    }

    async fn probe_tcp(&self, addr: SocketAddr, deadline: Instant) -> ProbeStatus {
        match timeout_at(deadline, TcpStream::connect(addr)).await {
            // The stream is dropped right away; nothing is sent on it.
            Ok(Ok(_stream)) => ProbeStatus::Open,
            Ok(Err(e)) => classify_connect_error(&e),
            Err(_) => ProbeStatus::Closed,
        }
    }

    async fn probe_udp(&self, addr: SocketAddr, deadline: Instant) -> ProbeStatus {
        let socket = match UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await {
            Ok(socket) => socket,
            Err(e) => return ProbeStatus::Errored(e.to_string()),
        };

        match timeout_at(deadline, socket.connect(addr)).await {
            Ok(Ok(())) => ProbeStatus::Open,
            Ok(Err(e)) => classify_connect_error(&e),
            Err(_) => ProbeStatus::Closed,
        }
    }
}

#[async_trait]
impl Prober for ConnectProber {
    fn strategy(&self) -> Strategy {
        Strategy::Full
    }

    async fn probe(&self, port: Port) -> ProbeOutcome {
        let deadline = Instant::now() + self.timeout;
        let resolve = async { self.host.resolve_with(self.resolver().await).await };

        let status = match timeout_at(deadline, resolve).await {
            Ok(Ok(ip)) => {
                let addr = SocketAddr::new(ip.into(), port.as_u16());
                match self.protocol {
                    Protocol::Tcp => self.probe_tcp(addr, deadline).await,
                    Protocol::Udp => self.probe_udp(addr, deadline).await,
                }
            }
            Ok(Err(e)) => ProbeStatus::Errored(e.to_string()),
            Err(_) => ProbeStatus::Errored(format!("resolving {} timed out", self.host)),
        };

        debug!(%port, protocol = %self.protocol, ?status, "connect probe finished");
        ProbeOutcome::new(port, Strategy::Full, status)
    }
}

/// Map a connect error to a port state.
///
/// Refusals, timeouts and unreachable routes say something about the port
/// or the path to it and count as closed. Everything else is a local or
/// transport problem and is reported as an error.
fn classify_connect_error(err: &io::Error) -> ProbeStatus {
    match err.kind() {
        io::ErrorKind::ConnectionRefused | io::ErrorKind::TimedOut => return ProbeStatus::Closed,
        _ => {}
    }

    match err.raw_os_error() {
        Some(libc::EHOSTUNREACH | libc::ENETUNREACH | libc::EHOSTDOWN | libc::ECONNRESET) => {
            ProbeStatus::Closed
        }
        _ => ProbeStatus::Errored(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn localhost_prober(protocol: Protocol) -> ConnectProber {
        ConnectProber::new(
            Host::Ip(Ipv4Addr::LOCALHOST),
            protocol,
            Duration::from_millis(500),
        )
    }

    #[test]
    fn test_prober_creation() {
        let prober = localhost_prober(Protocol::Tcp);
        assert_eq!(prober.strategy(), Strategy::Full);
    }

    #[tokio::test]
    async fn test_open_tcp_port() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = Port::new(listener.local_addr().unwrap().port());

        let outcome = localhost_prober(Protocol::Tcp).probe(port).await;
        assert_eq!(outcome.status, ProbeStatus::Open);
        assert_eq!(outcome.port, port);
    }

    #[tokio::test]
    async fn test_closed_tcp_port() {
        // Bind then release a port so nothing is listening on it.
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = Port::new(listener.local_addr().unwrap().port());
        drop(listener);

        let outcome = localhost_prober(Protocol::Tcp).probe(port).await;
        assert_eq!(outcome.status, ProbeStatus::Closed);
        assert_eq!(outcome.log_line(), format!("Port {} is closed (full scan)", port));
    }

    #[tokio::test]
    async fn test_udp_association_counts_as_open() {
        let outcome = localhost_prober(Protocol::Udp).probe(Port::new(9)).await;
        assert_eq!(outcome.status, ProbeStatus::Open);
    }

    #[tokio::test]
    async fn test_unresolvable_host_is_errored() {
        let prober = ConnectProber::new(
            Host::Name("nonexistent.invalid".to_string()),
            Protocol::Tcp,
            Duration::from_millis(300),
        );

        for port in [Port::new(80), Port::new(81)] {
            let outcome = prober.probe(port).await;
            assert!(matches!(outcome.status, ProbeStatus::Errored(_)));
            assert!(outcome
                .log_line()
                .starts_with(&format!("Socket error on port {} (full scan): ", port)));
        }
    }

    #[test]
    fn test_classify_connect_error() {
        assert_eq!(
            classify_connect_error(&io::Error::from(io::ErrorKind::ConnectionRefused)),
            ProbeStatus::Closed
        );
        assert_eq!(
            classify_connect_error(&io::Error::from_raw_os_error(libc::EHOSTUNREACH)),
            ProbeStatus::Closed
        );
        assert_eq!(
            classify_connect_error(&io::Error::from_raw_os_error(libc::ENETUNREACH)),
            ProbeStatus::Closed
        );
        assert!(matches!(
            classify_connect_error(&io::Error::from_raw_os_error(libc::EACCES)),
            ProbeStatus::Errored(_)
        ));
        assert!(matches!(
            classify_connect_error(&io::Error::from(io::ErrorKind::AddrNotAvailable)),
            ProbeStatus::Errored(_)
        ));
    }
}
