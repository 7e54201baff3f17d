//! # fop - find open ports
//!
//! Probes a host's ports one at a time and reports which of them accept
//! connections. Two strategies are available:
//!
//! - **Full connect**: a regular TCP handshake (or UDP association) through
//!   the OS socket API. No privileges needed.
//! - **SYN (half-open)**: a raw SYN segment; a SYN/ACK reply marks the port
//!   open and is answered with RST. Needs raw socket access.
//!
//! By default the scan stops at the first open port; with `ignore` set it
//! visits every port.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use fop::scanner::{create_prober, run_scan, ScanConfig};
//! use fop::types::{resolve, ExclusionSet, Host};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ScanConfig::new("127.0.0.1".parse::<Host>()?).with_ignore(true);
//!     let ports = resolve("22,80,8000-8010", &ExclusionSet::new())?;
//!
//!     let prober = create_prober(&config).await?;
//!     let result = run_scan(prober.as_ref(), &config, &ports, |_| {}).await;
//!
//!     println!("open: {:?}", result.open_ports);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Ports, port specifications and target hosts
//! - [`scanner`] - The `Prober` trait, both strategies and the scan loop
//! - [`config`] - Settings file
//! - [`output`] - Summary, console, JSON and log file rendering
//! - [`cli`] - Command-line front end
//! - [`error`] - Error types

pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod scanner;
pub mod types;

// Re-export commonly used types
pub use error::{ConfigError, ScanError};
pub use scanner::{ProbeOutcome, ProbeStatus, Prober, ScanConfig, ScanResult, Strategy};
pub use types::{Host, Port, PortSpec};
