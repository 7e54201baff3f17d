//! Plain text output formatting.
//!
//! Produces human-readable output with colors.

use super::{summary_message, verbose_line};
use crate::scanner::{ProbeOutcome, ProbeStatus, ScanResult};
use console::style;
use std::io::{self, Write};

/// Print the summary line.
pub fn print_plain(result: &ScanResult) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let summary = summary_message(&result.open_ports);
    if result.open_ports.is_empty() {
        writeln!(out, "{}", summary)?;
    } else {
        writeln!(out, "{}", style(summary).green())?;
    }

    Ok(())
}

/// Print one probe outcome as it happens (verbose mode).
pub fn print_probe(outcome: &ProbeOutcome) {
    let line = verbose_line(outcome);
    match outcome.status {
        ProbeStatus::Open => println!("{}", style(line).green()),
        ProbeStatus::Closed => println!("{}", line),
        ProbeStatus::Errored(_) => println!("{}", style(line).red()),
    }
}

/// Print a scan header before scanning begins (verbose mode).
pub fn print_scan_header(host: &str, strategy: &str, ports: usize) {
    println!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("fop").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{} Strategy: {}", style("•").dim(), style(strategy).yellow());
    println!("{} Target: {}", style("•").dim(), style(host).white().bold());
    println!(
        "{} Scanning {} ports...",
        style("•").dim(),
        style(ports).white().bold()
    );
    println!();
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}
