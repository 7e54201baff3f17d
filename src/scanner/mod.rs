//! Scanner module - drives probes over a resolved port list.
//!
//! One prober is chosen per run from the configured strategy. Ports are
//! probed strictly one at a time, in ascending order, and every outcome is
//! folded into a single [`ScanResult`] owned by [`run_scan`].

pub mod connect;
pub mod syn;
pub mod traits;

use crate::error::Result;
use crate::types::Port;
use serde::Serialize;
use std::time::Instant;
use tracing::{info, warn};

pub use connect::ConnectProber;
pub use syn::{PacketTransport, PnetTransport, ReplyFilter, SynProber};
pub use traits::{
    timeout_from_secs, BoxedProber, ProbeOutcome, ProbeStatus, Prober, Protocol, ScanConfig,
    Strategy,
};

/// Where the probe loop stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    /// More ports remain and nothing forces a stop.
    Scanning,
    /// An open port was recorded and early termination applies.
    FoundAndStopping,
    /// Every port was probed.
    Exhausted,
}

impl ScanState {
    /// State after a probe has been recorded.
    ///
    /// The stop check runs only once the hit is in `open_ports`, so a run
    /// that stops early always reports the port that stopped it.
    pub fn after_probe(found_open: bool, ignore: bool, ports_left: bool) -> Self {
        if found_open && !ignore {
            Self::FoundAndStopping
        } else if ports_left {
            Self::Scanning
        } else {
            Self::Exhausted
        }
    }

    pub fn is_done(self) -> bool {
        self != Self::Scanning
    }
}

/// Accumulated results of one run.
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    /// Open ports in the order they were found.
    pub open_ports: Vec<Port>,
    /// One line per probed port.
    pub log_lines: Vec<String>,
    /// Final state of the probe loop.
    pub state: ScanState,
}

impl ScanResult {
    fn new() -> Self {
        Self {
            open_ports: Vec::new(),
            log_lines: Vec::new(),
            state: ScanState::Scanning,
        }
    }

    fn record(&mut self, outcome: &ProbeOutcome) {
        self.log_lines.push(outcome.log_line());
        if outcome.is_open() {
            self.open_ports.push(outcome.port);
        }
    }

    /// Number of ports that were actually probed.
    pub fn ports_probed(&self) -> usize {
        self.log_lines.len()
    }
}

/// Create the prober for the configured strategy.
///
/// Fatal conditions (unresolvable SYN target, missing raw socket privilege)
/// surface here, before any port is probed.
pub async fn create_prober(config: &ScanConfig) -> Result<BoxedProber> {
    config.validate()?;

    match config.strategy {
        Strategy::Full => Ok(Box::new(ConnectProber::new(
            config.host.clone(),
            config.protocol,
            config.timeout,
        ))),
        Strategy::Syn => {
            if config.protocol == Protocol::Udp {
                warn!("SYN probes are TCP only; ignoring protocol UDP");
            }
            Ok(Box::new(SynProber::open(&config.host, config.timeout).await?))
        }
    }
}

/// Probe `ports` in order and collect the results.
///
/// `on_probe` sees every outcome as soon as it is known, before it is
/// recorded; the reporter uses it for verbose streaming. Per-port errors
/// are recorded and never stop the loop.
pub async fn run_scan<F>(
    prober: &dyn Prober,
    config: &ScanConfig,
    ports: &[Port],
    mut on_probe: F,
) -> ScanResult
where
    F: FnMut(&ProbeOutcome),
{
    let start_time = Instant::now();
    let mut result = ScanResult::new();

    info!(
        host = %config.host,
        strategy = %prober.strategy(),
        ports = ports.len(),
        ignore = config.ignore,
        "starting scan"
    );

    let mut remaining = ports.iter().copied().peekable();
    if remaining.peek().is_none() {
        result.state = ScanState::Exhausted;
    }

    while !result.state.is_done() {
        let Some(port) = remaining.next() else {
            result.state = ScanState::Exhausted;
            break;
        };

        let outcome = prober.probe(port).await;
        on_probe(&outcome);
        result.record(&outcome);

        result.state = ScanState::after_probe(
            !result.open_ports.is_empty(),
            config.ignore,
            remaining.peek().is_some(),
        );
    }

    info!(
        probed = result.ports_probed(),
        open = result.open_ports.len(),
        state = ?result.state,
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "scan finished"
    );

    result
}
