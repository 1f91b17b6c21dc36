// src/config.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::error::ConfigError;
use crate::logging::get_config_dir;

/// Ports probed when no explicit list is configured.
pub const DEFAULT_PORTS: [u16; 9] = [80, 443, 8080, 8443, 21, 22, 25, 3306, 5432];

pub const CONFIG_FILE: &str = "config.json";

/// Tunables for a scanner instance. Every field has a default, so a config file only
/// needs to list the values it overrides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScannerConfig {
    pub ports: Vec<u16>,
    pub probe_timeout_ms: u64,
    /// Upper bound on concurrent port probes; never exceeds the number of candidates.
    pub probe_concurrency: usize,

    pub tls_port: u16,
    pub tls_timeout_secs: u64,

    pub http_port: u16,
    pub https_port: u16,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub use_system_proxy: bool,
    /// Lets the HTTPS header fetch talk to self-signed or expired endpoints. Off by default.
    pub accept_invalid_certs: bool,

    pub dns_timeout_secs: u64,
    pub dns_attempts: usize,
    pub use_system_resolver: bool,

    pub scan_timeout_secs: u64,
    pub collaborator_timeout_secs: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            ports: DEFAULT_PORTS.to_vec(),
            probe_timeout_ms: 200,
            probe_concurrency: DEFAULT_PORTS.len(),
            tls_port: 443,
            tls_timeout_secs: 5,
            http_port: 80,
            https_port: 443,
            http_timeout_secs: 10,
            user_agent: format!("Mozilla/5.0 (compatible; NetSpecter-RS/{})", env!("CARGO_PKG_VERSION")),
            use_system_proxy: false,
            accept_invalid_certs: false,
            dns_timeout_secs: 3,
            dns_attempts: 2,
            use_system_resolver: true,
            scan_timeout_secs: 180,
            collaborator_timeout_secs: 30,
        }
    }
}

impl ScannerConfig {
    /// Loads `config.json` from the project config directory, falling back to defaults
    /// when the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            debug!(path = %path.display(), "No config file found, using defaults.");
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "Loaded scanner configuration.");
        Ok(config)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn tls_timeout(&self) -> Duration {
        Duration::from_secs(self.tls_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_secs(self.dns_timeout_secs)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }

    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_secs(self.collaborator_timeout_secs)
    }
}

pub fn default_config_path() -> PathBuf {
    get_config_dir().join(CONFIG_FILE)
}
