//! Configuration management for fop.
//!
//! Defaults for the command-line options live in an XDG-compliant
//! settings file.

mod settings;

pub use settings::{AppSettings, Paths};
