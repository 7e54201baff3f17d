//! Port types with validation and parsing.
//!
//! `PortSpec` handles the `80,100-200,443` grammar, `ExclusionSet` the
//! comma-separated list of ports to skip, and [`resolve`] combines the two
//! into the ascending, deduplicated list the scanner walks.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::num::IntErrorKind;
use std::str::FromStr;

/// A network port number (0-65535).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Port(u16);

impl Port {
    #[inline]
    pub const fn new(port: u16) -> Self {
        Self(port)
    }

    /// Get the raw port number.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for Port {
    fn from(port: u16) -> Self {
        Self(port)
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

impl FromStr for Port {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PortError::Empty);
        }

        let value: u32 = s.parse().map_err(|e: std::num::ParseIntError| match e.kind() {
            IntErrorKind::PosOverflow => PortError::OutOfRange(s.to_string()),
            _ => PortError::InvalidFormat(s.to_string()),
        })?;

        u16::try_from(value)
            .map(Self)
            .map_err(|_| PortError::OutOfRange(s.to_string()))
    }
}

/// Error type for port parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("port {0} is out of valid range (0-65535)")]
    OutOfRange(String),
    #[error("invalid port number: {0}")]
    InvalidFormat(String),
    #[error("invalid port range: start ({0}) > end ({1})")]
    InvalidRange(u16, u16),
    #[error("empty port specification")]
    Empty,
}

/// A range of ports (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    start: Port,
    end: Port,
}

impl PortRange {
    /// Create a new port range.
    pub fn new(start: Port, end: Port) -> Result<Self, PortError> {
        if start > end {
            Err(PortError::InvalidRange(start.0, end.0))
        } else {
            Ok(Self { start, end })
        }
    }

    /// Create a range containing a single port.
    pub const fn single(port: Port) -> Self {
        Self {
            start: port,
            end: port,
        }
    }

    /// Iterate over all ports in this range.
    pub fn iter(&self) -> impl Iterator<Item = Port> {
        (self.start.0..=self.end.0).map(Port)
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// A port specification made of single ports and inclusive ranges.
///
/// Supports formats like:
/// - Single port: "80"
/// - Comma-separated: "80,443,8080"
/// - Range: "1-1000"
/// - Mixed: "22,80,443,8000-9000"
#[derive(Debug, Clone, Default)]
pub struct PortSpec {
    ranges: Vec<PortRange>,
}

impl PortSpec {
    /// All ports as a sorted, deduplicated set.
    pub fn to_set(&self) -> BTreeSet<Port> {
        self.ranges.iter().flat_map(|r| r.iter()).collect()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl FromStr for PortSpec {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(PortError::Empty);
        }

        let mut ranges = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            if part.contains('-') {
                let bounds: Vec<&str> = part.split('-').collect();
                if bounds.len() != 2 {
                    return Err(PortError::InvalidFormat(part.to_string()));
                }
                let start: Port = bounds[0].parse().map_err(|e| match e {
                    PortError::Empty => PortError::InvalidFormat(part.to_string()),
                    other => other,
                })?;
                let end: Port = bounds[1].parse().map_err(|e| match e {
                    PortError::Empty => PortError::InvalidFormat(part.to_string()),
                    other => other,
                })?;
                ranges.push(PortRange::new(start, end)?);
            } else {
                ranges.push(PortRange::single(part.parse()?));
            }
        }

        Ok(Self { ranges })
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.ranges.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Ports removed from a [`PortSpec`] before scanning.
///
/// Parsed from a comma-separated list of single ports; ranges are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet(BTreeSet<Port>);

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, port: Port) -> bool {
        self.0.contains(&port)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Port> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = Port>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromStr for ExclusionSet {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',').map(str::parse::<Port>).collect()
    }
}

/// Expand `spec` into the ascending list of ports to probe, minus `exclusions`.
pub fn resolve(spec: &str, exclusions: &ExclusionSet) -> Result<Vec<Port>, PortError> {
    let spec: PortSpec = spec.parse()?;
    Ok(spec
        .to_set()
        .into_iter()
        .filter(|port| !exclusions.contains(*port))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ports(values: &[u16]) -> Vec<Port> {
        values.iter().copied().map(Port::new).collect()
    }

    #[test]
    fn test_resolve_mixed_spec() {
        let resolved = resolve("80,100-102", &ExclusionSet::new()).unwrap();
        assert_eq!(resolved, ports(&[80, 100, 101, 102]));
    }

    #[test]
    fn test_resolve_with_exclusions() {
        let exclusions: ExclusionSet = "100".parse().unwrap();
        let resolved = resolve("80,100-102", &exclusions).unwrap();
        assert_eq!(resolved, ports(&[80, 101, 102]));
    }

    #[test]
    fn test_resolve_sorts_and_dedups() {
        let resolved = resolve("443,80,79-81,80", &ExclusionSet::new()).unwrap();
        assert_eq!(resolved, ports(&[79, 80, 81, 443]));
    }

    #[test]
    fn test_resolve_everything_excluded() {
        let exclusions: ExclusionSet = "22,23".parse().unwrap();
        let resolved = resolve("22-23", &exclusions).unwrap();
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_reversed_range_rejected() {
        assert_eq!(
            resolve("70-65", &ExclusionSet::new()),
            Err(PortError::InvalidRange(70, 65))
        );
    }

    #[test]
    fn test_bounds_inclusive() {
        let resolved = resolve("0,65535", &ExclusionSet::new()).unwrap();
        assert_eq!(resolved, ports(&[0, 65535]));
    }

    #[test]
    fn test_out_of_range() {
        assert!(matches!(
            resolve("65536", &ExclusionSet::new()),
            Err(PortError::OutOfRange(_))
        ));
        assert!(matches!(
            resolve("1-70000", &ExclusionSet::new()),
            Err(PortError::OutOfRange(_))
        ));
        assert!(matches!(
            resolve("99999999999", &ExclusionSet::new()),
            Err(PortError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_malformed_segments() {
        for spec in ["abc", "80,http", "1-2-3", "-5", "10-", "80,,90", ""] {
            assert!(resolve(spec, &ExclusionSet::new()).is_err(), "{spec:?} should fail");
        }
    }

    #[test]
    fn test_whitespace_tolerated() {
        let resolved = resolve(" 22 , 80 - 81 ", &ExclusionSet::new()).unwrap();
        assert_eq!(resolved, ports(&[22, 80, 81]));
    }

    #[test]
    fn test_exclusions_reject_ranges() {
        assert!("10-20".parse::<ExclusionSet>().is_err());
        assert!("10,x".parse::<ExclusionSet>().is_err());
        let set: ExclusionSet = "10, 20,10".parse().unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains(Port::new(20)));
    }

    #[test]
    fn test_port_spec_display() {
        let spec: PortSpec = "22,80-90".parse().unwrap();
        assert_eq!(spec.to_string(), "22,80-90");
        assert!(!spec.is_empty());
    }
}
