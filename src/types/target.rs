//! Target host types.
//!
//! A target is written `host:ports` on the command line. The host is either
//! an IPv4 literal or a hostname that is resolved through DNS when a probe
//! needs an address.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use tracing::warn;
use trust_dns_resolver::TokioAsyncResolver;

/// Error type for target parsing and resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("invalid target format: {0} (expected HOST:PORTS)")]
    InvalidFormat(String),
    #[error("invalid host: {0}")]
    InvalidHost(String),
    #[error("IPv6 targets are not supported: {0}")]
    Ipv6Unsupported(String),
    #[error("failed to resolve hostname '{0}': {1}")]
    DnsResolutionFailed(String, String),
    #[error("no IPv4 addresses found for hostname '{0}'")]
    NoAddressesFound(String),
}

/// The host half of a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Host {
    /// An IPv4 address literal.
    Ip(Ipv4Addr),
    /// A hostname to be resolved.
    Name(String),
}

impl Host {
    /// Resolve this host to an IPv4 address with a fresh system resolver.
    ///
    /// Callers that resolve repeatedly should keep one resolver from
    /// [`system_resolver`] and use [`Host::resolve_with`].
    pub async fn resolve(&self) -> Result<Ipv4Addr, TargetError> {
        match self {
            Self::Ip(ip) => Ok(*ip),
            Self::Name(_) => self.resolve_with(&system_resolver()).await,
        }
    }

    /// Resolve this host through `resolver`. Literals never touch it; for
    /// names the first IPv4 answer wins.
    pub async fn resolve_with(
        &self,
        resolver: &TokioAsyncResolver,
    ) -> Result<Ipv4Addr, TargetError> {
        match self {
            Self::Ip(ip) => Ok(*ip),
            Self::Name(name) => {
                let response = resolver.lookup_ip(name.as_str()).await.map_err(|e| {
                    TargetError::DnsResolutionFailed(name.clone(), e.to_string())
                })?;

                response
                    .iter()
                    .find_map(|ip| match ip {
                        IpAddr::V4(v4) => Some(v4),
                        IpAddr::V6(_) => None,
                    })
                    .ok_or_else(|| TargetError::NoAddressesFound(name.clone()))
            }
        }
    }
}

/// Build a resolver from the host's own configuration (`/etc/resolv.conf`
/// on Unix). Falls back to the library defaults when that cannot be read.
pub fn system_resolver() -> TokioAsyncResolver {
    match TokioAsyncResolver::tokio_from_system_conf() {
        Ok(resolver) => resolver,
        Err(e) => {
            warn!(error = %e, "system resolver configuration unavailable; using defaults");
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        }
    }
}

impl FromStr for Host {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        match s.parse::<IpAddr>() {
            Ok(IpAddr::V4(ip)) => return Ok(Self::Ip(ip)),
            Ok(IpAddr::V6(_)) => return Err(TargetError::Ipv6Unsupported(s.to_string())),
            Err(_) => {}
        }

        if is_valid_hostname(s) {
            Ok(Self::Name(s.to_string()))
        } else {
            Err(TargetError::InvalidHost(s.to_string()))
        }
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ip(ip) => write!(f, "{}", ip),
            Self::Name(name) => write!(f, "{}", name),
        }
    }
}

/// A `host:ports` pair as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    pub host: Host,
    /// Raw port specification, parsed later by [`crate::types::resolve`].
    pub ports: String,
}

impl FromStr for TargetSpec {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 2 {
            return Err(TargetError::InvalidFormat(s.to_string()));
        }

        Ok(Self {
            host: parts[0].parse()?,
            ports: parts[1].to_string(),
        })
    }
}

/// Check if a string is a valid hostname.
fn is_valid_hostname(s: &str) -> bool {
    if s.is_empty() || s.len() > 253 {
        return false;
    }

    // Each label must be 1-63 characters
    for label in s.split('.') {
        if label.is_empty() || label.len() > 63 {
            return false;
        }
        // Must start and end with alphanumeric
        if !label.chars().next().is_some_and(|c| c.is_ascii_alphanumeric()) {
            return false;
        }
        if !label.chars().last().is_some_and(|c| c.is_ascii_alphanumeric()) {
            return false;
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target_spec() {
        let spec: TargetSpec = "192.168.1.1:80,443".parse().unwrap();
        assert_eq!(spec.host, Host::Ip(Ipv4Addr::new(192, 168, 1, 1)));
        assert_eq!(spec.ports, "80,443");

        let spec: TargetSpec = "example.com:1-1024".parse().unwrap();
        assert_eq!(spec.host, Host::Name("example.com".to_string()));
    }

    #[test]
    fn test_target_spec_needs_one_colon() {
        assert!(matches!(
            "192.168.1.1".parse::<TargetSpec>(),
            Err(TargetError::InvalidFormat(_))
        ));
        assert!(matches!(
            "a:b:c".parse::<TargetSpec>(),
            Err(TargetError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_ipv6_rejected() {
        assert!(matches!(
            "::1".parse::<Host>(),
            Err(TargetError::Ipv6Unsupported(_))
        ));
    }

    #[test]
    fn test_invalid_host() {
        assert!(matches!(
            "-bad-.com".parse::<Host>(),
            Err(TargetError::InvalidHost(_))
        ));
        assert!(matches!("".parse::<Host>(), Err(TargetError::InvalidHost(_))));
    }

    #[test]
    fn test_literal_resolves_without_dns() {
        let host: Host = "10.0.0.7".parse().unwrap();
        let ip = tokio_test::block_on(host.resolve()).unwrap();
        assert_eq!(ip, Ipv4Addr::new(10, 0, 0, 7));
    }

    #[tokio::test]
    async fn test_unknown_name_fails_to_resolve() {
        let host = Host::Name("nonexistent.invalid".to_string());
        let resolver = system_resolver();

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            host.resolve_with(&resolver),
        )
        .await;
        // A resolver that never answers is also a failure to resolve.
        if let Ok(resolved) = result {
            assert!(resolved.is_err());
        }
    }

    #[test]
    fn test_valid_hostname() {
        assert!(is_valid_hostname("example.com"));
        assert!(is_valid_hostname("my-server"));
        assert!(!is_valid_hostname(""));
        assert!(!is_valid_hostname("under_score.com"));
    }
}
