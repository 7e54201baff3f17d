//! SYN (Stealth) prober implementation.
//!
//! Performs half-open TCP probing by sending a bare SYN segment and reading
//! the reply without completing the handshake. This requires raw socket
//! access (root or `CAP_NET_RAW`).
//!
//! # How It Works
//!
//! 1. Send an IPv4 packet carrying a TCP segment with only SYN set
//! 2. Wait up to the timeout for a matching reply:
//!    - flags exactly SYN+ACK (`0x12`): port is open
//!    - anything else (usually RST), or silence: port is closed
//! 3. On open, send a single RST so the remote side drops the half-open
//!    connection. Its outcome is ignored.

use crate::error::{Result, ScanError};
use crate::scanner::traits::{ProbeOutcome, ProbeStatus, Prober, Strategy};
use crate::types::{Host, Port};
use async_trait::async_trait;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::{self, Ipv4Flags, Ipv4Packet, MutableIpv4Packet};
use pnet::packet::tcp::{self, MutableTcpPacket, TcpFlags, TcpPacket};
use pnet::packet::Packet;
use pnet::transport::TransportChannelType::Layer3;
use pnet::transport::{ipv4_packet_iter, transport_channel, TransportReceiver, TransportSender};
use rand::Rng;
use std::io;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Flag combination that marks a listening port.
pub const SYN_ACK: u8 = TcpFlags::SYN | TcpFlags::ACK;

const IPV4_HEADER_LEN: usize = 20;
const TCP_HEADER_LEN: usize = 20;
const CHANNEL_BUFFER: usize = 4096;
/// Shortest wait handed to the raw socket. A receive timeout that rounds
/// down to zero microseconds disables the timeout instead of expiring it.
const MIN_RECV_WAIT: Duration = Duration::from_millis(1);

/// Raw packet I/O used by the SYN prober.
///
/// Implementations own a single send/receive capability. The prober holds
/// it behind a mutex so one request/response pair is in flight at a time.
pub trait PacketTransport: Send {
    /// Send a complete IPv4 packet to `destination`.
    fn send(&mut self, packet: &[u8], destination: Ipv4Addr) -> io::Result<()>;

    /// Wait up to `timeout` for a packet accepted by `filter` and return its TCP flags.
    fn recv_reply(&mut self, filter: &ReplyFilter, timeout: Duration) -> io::Result<Option<u8>>;
}

/// Identifies the reply to one SYN probe among all incoming TCP traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyFilter {
    /// Address the probe was sent to.
    pub target: Ipv4Addr,
    /// Port that was probed (the reply's source port).
    pub remote_port: u16,
    /// Source port used for the probe (the reply's destination port).
    pub local_port: u16,
    /// Sequence number of the SYN; a genuine reply acknowledges it plus one.
    pub sequence: u32,
}

impl ReplyFilter {
    /// Return the TCP flags of `packet` if it answers this probe.
    pub fn matches(&self, packet: &Ipv4Packet) -> Option<u8> {
        if packet.get_source() != self.target
            || packet.get_next_level_protocol() != IpNextHeaderProtocols::Tcp
        {
            return None;
        }

        let segment = TcpPacket::new(packet.payload())?;
        if segment.get_source() != self.remote_port
            || segment.get_destination() != self.local_port
            || segment.get_acknowledgement() != self.sequence.wrapping_add(1)
        {
            return None;
        }

        Some(segment.get_flags())
    }
}

/// Fields of one outgoing IPv4 + TCP packet.
#[derive(Debug, Clone, Copy)]
pub struct TcpSegment {
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub source_port: u16,
    pub destination_port: u16,
    pub sequence: u32,
    pub acknowledgement: u32,
    pub flags: u8,
}

impl TcpSegment {
    /// Build the wire bytes: a 20-byte IPv4 header followed by a 20-byte TCP header.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; IPV4_HEADER_LEN + TCP_HEADER_LEN];

        {
            let mut ip_packet = MutableIpv4Packet::new(&mut buffer).ok_or_else(|| {
                ScanError::ProbeTransport("failed to create IPv4 packet".to_string())
            })?;

            ip_packet.set_version(4);
            ip_packet.set_header_length(5);
            ip_packet.set_dscp(0);
            ip_packet.set_ecn(0);
            ip_packet.set_total_length((IPV4_HEADER_LEN + TCP_HEADER_LEN) as u16);
            ip_packet.set_identification(rand::random());
            ip_packet.set_flags(Ipv4Flags::DontFragment);
            ip_packet.set_fragment_offset(0);
            ip_packet.set_ttl(64);
            ip_packet.set_next_level_protocol(IpNextHeaderProtocols::Tcp);
            ip_packet.set_source(self.source);
            ip_packet.set_destination(self.destination);
            ip_packet.set_checksum(ipv4::checksum(&ip_packet.to_immutable()));
        }

        {
            let mut tcp_packet = MutableTcpPacket::new(&mut buffer[IPV4_HEADER_LEN..])
                .ok_or_else(|| {
                    ScanError::ProbeTransport("failed to create TCP packet".to_string())
                })?;

            tcp_packet.set_source(self.source_port);
            tcp_packet.set_destination(self.destination_port);
            tcp_packet.set_sequence(self.sequence);
            tcp_packet.set_acknowledgement(self.acknowledgement);
            tcp_packet.set_data_offset(5);
            tcp_packet.set_reserved(0);
            tcp_packet.set_flags(self.flags);
            tcp_packet.set_window(64240);
            tcp_packet.set_urgent_ptr(0);

            let checksum =
                tcp::ipv4_checksum(&tcp_packet.to_immutable(), &self.source, &self.destination);
            tcp_packet.set_checksum(checksum);
        }

        Ok(buffer)
    }
}

/// Time left to wait for a reply, or `None` once it is too short to arm a
/// socket timeout.
fn recv_wait(deadline: Instant, now: Instant) -> Option<Duration> {
    let remaining = deadline.saturating_duration_since(now);
    (remaining >= MIN_RECV_WAIT).then_some(remaining)
}

/// Layer-3 raw channel from `pnet`.
pub struct PnetTransport {
    tx: TransportSender,
    rx: TransportReceiver,
}

impl PnetTransport {
    /// Open the raw channel.
    ///
    /// # Errors
    /// Returns [`ScanError::Privilege`] when the process may not open raw sockets.
    pub fn open() -> Result<Self> {
        match transport_channel(CHANNEL_BUFFER, Layer3(IpNextHeaderProtocols::Tcp)) {
            Ok((tx, rx)) => Ok(Self { tx, rx }),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => Err(ScanError::Privilege(
                "SYN scanning needs raw socket access (run as root or grant CAP_NET_RAW)"
                    .to_string(),
            )),
            Err(e) => Err(ScanError::ProbeTransport(format!(
                "failed to open raw channel: {}",
                e
            ))),
        }
    }
}

impl PacketTransport for PnetTransport {
    fn send(&mut self, packet: &[u8], destination: Ipv4Addr) -> io::Result<()> {
        let packet = Ipv4Packet::new(packet)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "truncated IPv4 packet"))?;
        self.tx.send_to(packet, IpAddr::V4(destination))?;
        Ok(())
    }

    fn recv_reply(&mut self, filter: &ReplyFilter, timeout: Duration) -> io::Result<Option<u8>> {
        let deadline = Instant::now() + timeout;
        let mut packets = ipv4_packet_iter(&mut self.rx);

        loop {
            let Some(remaining) = recv_wait(deadline, Instant::now()) else {
                return Ok(None);
            };

            match packets.next_with_timeout(remaining)? {
                Some((packet, _)) => {
                    if let Some(flags) = filter.matches(&packet) {
                        return Ok(Some(flags));
                    }
                }
                None => return Ok(None),
            }
        }
    }
}

/// SYN prober for stealth port scanning.
///
/// **Requires elevated privileges (root/sudo).**
pub struct SynProber {
    target: Ipv4Addr,
    source_ip: Ipv4Addr,
    timeout: Duration,
    transport: Arc<Mutex<Box<dyn PacketTransport>>>,
}

impl SynProber {
    /// Resolve the target and open the raw channel.
    ///
    /// # Errors
    /// Returns an error if:
    /// - the host cannot be resolved to an IPv4 address
    /// - the raw channel cannot be opened (missing privileges)
    /// - no local address routes to the target
    pub async fn open(host: &Host, timeout: Duration) -> Result<Self> {
        let target = host.resolve().await?;

        if !is_root() {
            warn!("SYN scanning usually requires root/sudo privileges");
        }

        let transport = PnetTransport::open()?;
        let source_ip = source_ip_for(target)?;
        debug!(%target, %source_ip, "raw channel ready");

        Ok(Self::with_transport(
            target,
            source_ip,
            timeout,
            Box::new(transport),
        ))
    }

    /// Build a prober around an already opened transport.
    pub fn with_transport(
        target: Ipv4Addr,
        source_ip: Ipv4Addr,
        timeout: Duration,
        transport: Box<dyn PacketTransport>,
    ) -> Self {
        Self {
            target,
            source_ip,
            timeout,
            transport: Arc::new(Mutex::new(transport)),
        }
    }
}

#[async_trait]
impl Prober for SynProber {
    fn strategy(&self) -> Strategy {
        Strategy::Syn
    }

    async fn probe(&self, port: Port) -> ProbeOutcome {
        let exchange = SynExchange {
            target: self.target,
            source_ip: self.source_ip,
            remote_port: port.as_u16(),
            local_port: rand_source_port(),
            sequence: rand::random(),
            timeout: self.timeout,
        };
        let transport = Arc::clone(&self.transport);

        let result = tokio::task::spawn_blocking(move || {
            let mut guard = transport.lock().map_err(|_| {
                ScanError::ProbeTransport("raw transport lock poisoned".to_string())
            })?;
            exchange.run(&mut **guard)
        })
        .await;

        let status = match result {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => ProbeStatus::Errored(e.to_string()),
            Err(e) => ProbeStatus::Errored(format!("probe task failed: {}", e)),
        };

        debug!(%port, ?status, "syn probe finished");
        ProbeOutcome::new(port, Strategy::Syn, status)
    }
}

/// One SYN request/response pair.
struct SynExchange {
    target: Ipv4Addr,
    source_ip: Ipv4Addr,
    remote_port: u16,
    local_port: u16,
    sequence: u32,
    timeout: Duration,
}

impl SynExchange {
    fn segment(&self, flags: u8, sequence: u32) -> TcpSegment {
        TcpSegment {
            source: self.source_ip,
            destination: self.target,
            source_port: self.local_port,
            destination_port: self.remote_port,
            sequence,
            acknowledgement: 0,
            flags,
        }
    }

    fn run(&self, transport: &mut dyn PacketTransport) -> Result<ProbeStatus> {
        let syn = self.segment(TcpFlags::SYN, self.sequence).to_bytes()?;
        transport
            .send(&syn, self.target)
            .map_err(|e| ScanError::ProbeTransport(e.to_string()))?;

        let filter = ReplyFilter {
            target: self.target,
            remote_port: self.remote_port,
            local_port: self.local_port,
            sequence: self.sequence,
        };
        let reply = transport
            .recv_reply(&filter, self.timeout)
            .map_err(|e| ScanError::ProbeTransport(e.to_string()))?;

        match reply {
            Some(SYN_ACK) => {
                self.send_reset(transport);
                Ok(ProbeStatus::Open)
            }
            Some(flags) => {
                debug!(port = self.remote_port, flags, "non SYN-ACK reply");
                Ok(ProbeStatus::Closed)
            }
            None => Ok(ProbeStatus::Closed),
        }
    }

    /// Tear down the half-open connection. Failures are logged and dropped.
    fn send_reset(&self, transport: &mut dyn PacketTransport) {
        let rst = self.segment(TcpFlags::RST, self.sequence.wrapping_add(1));
        let sent = rst.to_bytes().and_then(|packet| {
            transport
                .send(&packet, self.target)
                .map_err(|e| ScanError::ProbeTransport(e.to_string()))
        });
        if let Err(e) = sent {
            debug!(port = self.remote_port, error = %e, "failed to send RST");
        }
    }
}

/// Local IPv4 address the kernel would use to reach `target`.
fn source_ip_for(target: Ipv4Addr) -> Result<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .map_err(|e| ScanError::ProbeTransport(e.to_string()))?;
    socket
        .connect((target, 9))
        .map_err(|e| ScanError::ProbeTransport(format!("no route to {}: {}", target, e)))?;

    match socket.local_addr() {
        Ok(addr) => match addr.ip() {
            IpAddr::V4(ip) => Ok(ip),
            IpAddr::V6(_) => Err(ScanError::ProbeTransport(
                "no IPv4 source address available".to_string(),
            )),
        },
        Err(e) => Err(ScanError::ProbeTransport(e.to_string())),
    }
}

/// Check if running with root/admin privileges.
fn is_root() -> bool {
    #[cfg(unix)]
    {
        unsafe { libc::geteuid() == 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}

/// Generate a random source port in the ephemeral range.
fn rand_source_port() -> u16 {
    rand::thread_rng().gen_range(49152..65535)
}
