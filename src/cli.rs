//! Command-line interface definitions for fop.
//!
//! Uses `clap` derive macros for declarative argument parsing. Everything
//! that can be checked without touching the network (target syntax, port
//! specification, exclusions, timeout) is validated in [`Cli::plan`] before
//! a prober is created.

use crate::config::AppSettings;
use crate::error::ScanError;
use crate::output::{self, OutputFormat};
use crate::scanner::{
    create_prober, run_scan, timeout_from_secs, Protocol, ScanConfig, Strategy,
};
use crate::types::{resolve, ExclusionSet, Port, TargetError, TargetSpec};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

/// Find open ports on a host.
///
/// Probes each port with a full connect (TCP or UDP) or a half-open SYN
/// probe and stops at the first open port unless --ignore is given.
#[derive(Parser, Debug)]
#[command(name = "fop")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Find open ports on a host", long_about = None)]
pub struct Cli {
    /// Target host and ports, e.g. "192.168.1.1:22,80,8000-8100"
    #[arg(value_name = "HOST:PORTS")]
    pub target: String,

    /// Timeout per probe in seconds (default 1)
    #[arg(short = 't', long, value_name = "SECS", allow_negative_numbers = true)]
    pub timeout: Option<f64>,

    /// Save the log lines and summary to a file
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_file: Option<PathBuf>,

    /// Print every probe result while scanning
    #[arg(short, long, overrides_with = "no_verbose")]
    pub verbose: bool,

    /// Do not print per-probe results, even if the settings enable it
    #[arg(long, overrides_with = "verbose")]
    pub no_verbose: bool,

    /// Continue scanning all ports even if an open port is found
    #[arg(short, long, overrides_with = "no_ignore")]
    pub ignore: bool,

    /// Stop at the first open port, even if the settings say otherwise
    #[arg(long, overrides_with = "ignore")]
    pub no_ignore: bool,

    /// Ports to exclude from the scan, comma-separated
    #[arg(short, long, value_name = "PORTS")]
    pub exclude: Option<String>,

    /// Probe strategy (default full)
    #[arg(short = 's', long, value_enum, ignore_case = true)]
    pub strategy: Option<Strategy>,

    /// Protocol for the full strategy (default tcp)
    #[arg(short, long, value_enum, ignore_case = true)]
    pub protocol: Option<Protocol>,

    /// Output format for the final report
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,

    /// Path to a settings file to use instead of the default one
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// A validated run: what to probe and how.
#[derive(Debug, Clone)]
pub struct ScanPlan {
    pub config: ScanConfig,
    pub ports: Vec<Port>,
    pub verbose: bool,
}

impl Cli {
    /// Load settings, validate the arguments and run the scan.
    pub async fn execute(&self) -> anyhow::Result<()> {
        let settings = self.load_settings()?;
        let plan = self.plan(&settings)?;
        debug!(config = ?plan.config, ports = plan.ports.len(), "scan planned");

        let prober = create_prober(&plan.config).await?;
        let host = plan.config.host.to_string();

        if plan.verbose && self.format == OutputFormat::Plain {
            output::print_scan_header(&host, &prober.strategy().to_string(), plan.ports.len());
        }

        let verbose = plan.verbose && self.format == OutputFormat::Plain;
        let result = run_scan(prober.as_ref(), &plan.config, &plan.ports, |outcome| {
            if verbose {
                output::print_probe(outcome);
            }
        })
        .await;

        output::print_results(&host, &result, self.format)
            .context("failed to print results")?;

        if let Some(path) = &self.output_file {
            output::write_log_file(path, &result)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }

        Ok(())
    }

    fn load_settings(&self) -> anyhow::Result<AppSettings> {
        match &self.config {
            Some(path) => AppSettings::load_from(path)
                .with_context(|| format!("failed to load settings from {}", path.display())),
            None => AppSettings::load().context("failed to load settings"),
        }
    }

    /// Validate the arguments against `settings`. Never touches the network.
    pub fn plan(&self, settings: &AppSettings) -> Result<ScanPlan, ScanError> {
        let target: TargetSpec = self
            .target
            .parse()
            .map_err(|e: TargetError| ScanError::InvalidConfig(e.to_string()))?;

        let exclusions: ExclusionSet = match &self.exclude {
            Some(list) => list.parse()?,
            None => ExclusionSet::new(),
        };
        let ports = resolve(&target.ports, &exclusions)?;

        let timeout = timeout_from_secs(self.timeout.unwrap_or(settings.timeout_secs))?;

        let config = ScanConfig::new(target.host)
            .with_timeout(timeout)
            .with_protocol(self.protocol.unwrap_or(settings.protocol))
            .with_strategy(self.strategy.unwrap_or(settings.strategy))
            .with_ignore(switch(self.ignore, self.no_ignore, settings.ignore));
        config.validate()?;

        Ok(ScanPlan {
            config,
            ports,
            verbose: switch(self.verbose, self.no_verbose, settings.verbose),
        })
    }
}

/// Resolve an on/off flag pair against the settings value. clap keeps at
/// most one of the pair set, the one given last.
fn switch(on: bool, off: bool, default: bool) -> bool {
    if off {
        false
    } else {
        on || default
    }
}
