//! Prober trait abstraction.
//!
//! Defines a common interface for both probing strategies, so the
//! orchestrator picks one implementation per run and never branches on the
//! strategy again.

use crate::error::{Result, ScanError};
use crate::types::{Host, Port};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Classification of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    /// The port accepted or answered the probe.
    Open,
    /// Refused, reset, unreachable, or silent until the timeout.
    Closed,
    /// A transport failure unrelated to the port's state.
    Errored(String),
}

/// Result of probing one port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub port: Port,
    pub strategy: Strategy,
    pub status: ProbeStatus,
}

impl ProbeOutcome {
    pub fn new(port: Port, strategy: Strategy, status: ProbeStatus) -> Self {
        Self {
            port,
            strategy,
            status,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == ProbeStatus::Open
    }

    /// Human-readable line recorded in the scan log.
    pub fn log_line(&self) -> String {
        match &self.status {
            ProbeStatus::Open => format!("Successfully found open port {}", self.port),
            ProbeStatus::Closed => {
                format!("Port {} is closed ({})", self.port, self.strategy.label())
            }
            ProbeStatus::Errored(reason) => format!(
                "Socket error on port {} ({}): {}",
                self.port,
                self.strategy.label(),
                reason
            ),
        }
    }
}

/// Transport protocol used by the full connect strategy.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "TCP"),
            Self::Udp => write!(f, "UDP"),
        }
    }
}

impl std::str::FromStr for Protocol {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            _ => Err(ScanError::InvalidConfig(format!(
                "protocol must be either TCP or UDP, got '{}'",
                s
            ))),
        }
    }
}

/// Available probe strategies.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Full connect through the OS socket API (no special privileges required).
    #[default]
    Full,
    /// Half-open SYN probe over a raw socket (requires root/CAP_NET_RAW).
    Syn,
}

impl Strategy {
    /// Short label used in log lines.
    pub fn label(self) -> &'static str {
        match self {
            Self::Full => "full scan",
            Self::Syn => "stealth scan",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "FULL"),
            Self::Syn => write!(f, "SYN"),
        }
    }
}

impl std::str::FromStr for Strategy {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "full" | "connect" => Ok(Self::Full),
            "syn" | "stealth" => Ok(Self::Syn),
            _ => Err(ScanError::InvalidConfig(format!(
                "strategy must be either FULL or SYN, got '{}'",
                s
            ))),
        }
    }
}

/// Configuration for one scan run. Immutable once built.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Target host.
    pub host: Host,
    /// Per-probe timeout.
    pub timeout: Duration,
    /// Protocol for the full connect strategy.
    pub protocol: Protocol,
    /// Probe strategy.
    pub strategy: Strategy,
    /// Keep scanning after the first open port.
    pub ignore: bool,
}

impl ScanConfig {
    /// Default per-probe timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

    /// Create a new scan configuration with defaults.
    pub fn new(host: Host) -> Self {
        Self {
            host,
            timeout: Self::DEFAULT_TIMEOUT,
            protocol: Protocol::default(),
            strategy: Strategy::default(),
            ignore: false,
        }
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the protocol.
    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Set the strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Scan every port instead of stopping at the first open one.
    pub fn with_ignore(mut self, ignore: bool) -> Self {
        self.ignore = ignore;
        self
    }

    /// Check invariants that the builders cannot enforce.
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(ScanError::InvalidConfig(
                "timeout must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Convert a timeout given in seconds, rejecting zero, negative and non-finite values.
pub fn timeout_from_secs(secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ScanError::InvalidConfig(format!(
            "timeout must be greater than 0, got {}",
            secs
        )));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| ScanError::InvalidConfig(format!("invalid timeout {}: {}", secs, e)))
}

/// Trait for probe strategy implementations.
///
/// A prober is created once per run and asked about one port at a time.
/// Implementations keep no per-port state: any socket they open lives only
/// for the duration of a single `probe` call.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Get the strategy this prober implements.
    fn strategy(&self) -> Strategy;

    /// Probe a single port. Never blocks longer than the configured timeout.
    async fn probe(&self, port: Port) -> ProbeOutcome;
}

/// A boxed prober for dynamic dispatch.
pub type BoxedProber = Box<dyn Prober>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_log_lines() {
        let port = Port::new(80);
        assert_eq!(
            ProbeOutcome::new(port, Strategy::Full, ProbeStatus::Open).log_line(),
            "Successfully found open port 80"
        );
        assert_eq!(
            ProbeOutcome::new(port, Strategy::Full, ProbeStatus::Closed).log_line(),
            "Port 80 is closed (full scan)"
        );
        assert_eq!(
            ProbeOutcome::new(port, Strategy::Syn, ProbeStatus::Closed).log_line(),
            "Port 80 is closed (stealth scan)"
        );
        assert_eq!(
            ProbeOutcome::new(
                port,
                Strategy::Full,
                ProbeStatus::Errored("Permission denied".to_string())
            )
            .log_line(),
            "Socket error on port 80 (full scan): Permission denied"
        );
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("TCP".parse::<Protocol>().unwrap(), Protocol::Tcp);
        assert_eq!("udp".parse::<Protocol>().unwrap(), Protocol::Udp);
        assert_eq!("SYN".parse::<Strategy>().unwrap(), Strategy::Syn);
        assert_eq!("Full".parse::<Strategy>().unwrap(), Strategy::Full);
        assert!(matches!(
            "icmp".parse::<Protocol>(),
            Err(ScanError::InvalidConfig(_))
        ));
        assert!(matches!(
            "xmas".parse::<Strategy>(),
            Err(ScanError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_timeout_validation() {
        assert_eq!(timeout_from_secs(1.5).unwrap(), Duration::from_millis(1500));
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                timeout_from_secs(bad),
                Err(ScanError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_config_builder() {
        let config = ScanConfig::new(Host::Ip(Ipv4Addr::LOCALHOST))
            .with_timeout(Duration::from_millis(250))
            .with_protocol(Protocol::Udp)
            .with_strategy(Strategy::Syn)
            .with_ignore(true);

        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.protocol, Protocol::Udp);
        assert_eq!(config.strategy, Strategy::Syn);
        assert!(config.ignore);
        assert!(config.validate().is_ok());
        assert!(config.with_timeout(Duration::ZERO).validate().is_err());
    }
}
