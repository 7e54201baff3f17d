//! Output formatting module.
//!
//! Renders a finished [`ScanResult`] as plain text or JSON, streams
//! per-port lines in verbose mode, and writes the optional log file.

mod json_format;
mod plain;

pub use json_format::print_json;
pub use plain::{print_error, print_plain, print_probe, print_scan_header};

use crate::scanner::{ProbeOutcome, ProbeStatus, ScanResult};
use crate::types::Port;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Output format for the final report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable plain text
    #[default]
    Plain,
    /// JSON structured output
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Format and print scan results according to the specified format.
pub fn print_results(host: &str, result: &ScanResult, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Plain => print_plain(result),
        OutputFormat::Json => print_json(host, result),
    }
}

/// One-line summary of the run.
pub fn summary_message(open_ports: &[Port]) -> String {
    if open_ports.is_empty() {
        return "No open ports found.".to_string();
    }

    let ports: Vec<String> = open_ports.iter().map(|p| p.to_string()).collect();
    format!("Successfully found open ports: {}", ports.join(", "))
}

/// Line shown while scanning in verbose mode.
pub fn verbose_line(outcome: &ProbeOutcome) -> String {
    match outcome.status {
        ProbeStatus::Open => format!(
            "Port {} is open ({})",
            outcome.port,
            outcome.strategy.label()
        ),
        _ => outcome.log_line(),
    }
}

/// Write every log line, a blank line and the summary to `writer`.
pub fn write_log<W: Write>(mut writer: W, result: &ScanResult) -> io::Result<()> {
    for line in &result.log_lines {
        writeln!(writer, "{}", line)?;
    }
    writeln!(writer)?;
    writeln!(writer, "{}", summary_message(&result.open_ports))?;
    writer.flush()
}

/// Write the log to `path`, replacing any existing file.
pub fn write_log_file(path: &Path, result: &ScanResult) -> io::Result<()> {
    let file = File::create(path)?;
    write_log(BufWriter::new(file), result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{ScanState, Strategy};

    fn result(open: &[u16], lines: &[&str]) -> ScanResult {
        ScanResult {
            open_ports: open.iter().copied().map(Port::new).collect(),
            log_lines: lines.iter().map(|l| l.to_string()).collect(),
            state: ScanState::Exhausted,
        }
    }

    #[test]
    fn test_summary_message() {
        assert_eq!(summary_message(&[]), "No open ports found.");
        assert_eq!(
            summary_message(&[Port::new(22), Port::new(80)]),
            "Successfully found open ports: 22, 80"
        );
    }

    #[test]
    fn test_verbose_line() {
        let open = ProbeOutcome::new(Port::new(22), Strategy::Syn, ProbeStatus::Open);
        assert_eq!(verbose_line(&open), "Port 22 is open (stealth scan)");

        let closed = ProbeOutcome::new(Port::new(23), Strategy::Full, ProbeStatus::Closed);
        assert_eq!(verbose_line(&closed), "Port 23 is closed (full scan)");
    }

    #[test]
    fn test_write_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.log");
        let result = result(
            &[22],
            &["Port 21 is closed (full scan)", "Successfully found open port 22"],
        );

        write_log_file(&path, &result).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "Port 21 is closed (full scan)\n\
             Successfully found open port 22\n\
             \n\
             Successfully found open ports: 22\n"
        );
    }

    #[test]
    fn test_write_log_empty_run() {
        let mut buffer = Vec::new();
        write_log(&mut buffer, &result(&[], &[])).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "\nNo open ports found.\n");
    }
}
