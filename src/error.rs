//! Error types for fop.
//!
//! Uses `thiserror` for ergonomic error definitions.

use crate::types::{PortError, TargetError};
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for scanning operations.
///
/// Every variant except `ProbeTransport` is fatal to a run and is raised
/// before the first probe is sent. `ProbeTransport` describes a single
/// port and is folded into that port's outcome.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid port range: {0}")]
    InvalidRange(#[from] PortError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error("Transport error: {0}")]
    ProbeTransport(String),

    #[error("Permission denied: {0}")]
    Privilege(String),
}

/// Result type alias for scan operations.
pub type Result<T, E = ScanError> = std::result::Result<T, E>;

/// Errors raised while loading or saving settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine a configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("failed to write {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error("invalid settings file: {0}")]
    InvalidFormat(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
