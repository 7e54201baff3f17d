//! JSON output formatting.

use super::summary_message;
use crate::scanner::{ScanResult, ScanState};
use crate::types::Port;
use serde::Serialize;
use std::io;

#[derive(Serialize)]
struct JsonReport<'a> {
    host: &'a str,
    open_ports: &'a [Port],
    log_lines: &'a [String],
    state: ScanState,
    summary: String,
}

/// Render results as pretty-printed JSON.
pub fn to_json(host: &str, result: &ScanResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonReport {
        host,
        open_ports: &result.open_ports,
        log_lines: &result.log_lines,
        state: result.state,
        summary: summary_message(&result.open_ports),
    })
}

/// Print results in JSON format.
pub fn print_json(host: &str, result: &ScanResult) -> io::Result<()> {
    let json = to_json(host, result).map_err(io::Error::other)?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let result = ScanResult {
            open_ports: vec![Port::new(443)],
            log_lines: vec!["Successfully found open port 443".to_string()],
            state: ScanState::FoundAndStopping,
        };

        let value: serde_json::Value =
            serde_json::from_str(&to_json("example.com", &result).unwrap()).unwrap();
        assert_eq!(value["host"], "example.com");
        assert_eq!(value["open_ports"], serde_json::json!([443]));
        assert_eq!(value["state"], "found_and_stopping");
        assert_eq!(value["summary"], "Successfully found open ports: 443");
    }
}
