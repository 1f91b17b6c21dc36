// src/core/error.rs

use std::path::PathBuf;

use strum::Display;
use thiserror::Error;

/// The pipeline phase an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Phase {
    #[strum(to_string = "DNS resolution")]
    Dns,
    #[strum(to_string = "port probing")]
    Ports,
    #[strum(to_string = "TLS inspection")]
    Tls,
    #[strum(to_string = "HTTP fingerprinting")]
    Http,
}

/// Errors raised inside the scan pipeline.
///
/// Only `Resolution` (and `Cancelled` before the network phase completes) aborts a
/// scan; `Phase` errors are absorbed by the orchestrator and logged.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("unable to resolve '{target}': {reason}")]
    Resolution { target: String, reason: String },

    #[error("{phase} failed: {reason}")]
    Phase { phase: Phase, reason: String },

    #[error("scan cancelled")]
    Cancelled,
}

impl ScanError {
    pub fn phase(phase: Phase, reason: impl Into<String>) -> Self {
        ScanError::Phase { phase, reason: reason.into() }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
