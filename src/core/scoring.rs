// src/core/scoring.rs

use strum::Display;

use crate::core::knowledge_base::{CODENAME_ADJECTIVES, CODENAME_NOUNS, CODENAME_PREFIXES};
use crate::core::models::ScanReport;

const POINTS_PER_OPEN_PORT: f64 = 2.0;
const INVALID_TLS_PENALTY: f64 = 20.0;
const MAX_SCORE: f64 = 100.0;

/// Qualitative tier derived from a threat score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ThreatLevel {
    #[strum(to_string = "secure")]
    Secure,
    #[strum(to_string = "elevated")]
    Elevated,
    #[strum(to_string = "critical")]
    Critical,
}

impl ThreatLevel {
    pub fn from_score(score: f64) -> Self {
        if score > 75.0 {
            ThreatLevel::Critical
        } else if score > 40.0 {
            ThreatLevel::Elevated
        } else {
            ThreatLevel::Secure
        }
    }

    /// The human-readable summary stored on the report.
    pub fn summary(self) -> &'static str {
        match self {
            ThreatLevel::Critical => "CRITICAL THREAT DETECTED. Immediate remediation required.",
            ThreatLevel::Elevated => "ELEVATED RISK. Security hardening recommended.",
            ThreatLevel::Secure => "SECURE. System operating within normal parameters.",
        }
    }
}

/// Computes the composite threat score of an already-populated report.
///
/// Severity weights are summed over every vulnerability, each open port adds two
/// points and an invalid TLS result adds twenty. The result is clamped to `[0, 100]`.
pub fn calculate_threat_score(report: &ScanReport) -> f64 {
    let vulnerability_points: f64 = report.vulnerabilities.iter().map(|v| v.severity.weight()).sum();
    let port_points = report.open_ports.len() as f64 * POINTS_PER_OPEN_PORT;
    let tls_points = if report.ssl_info.valid { 0.0 } else { INVALID_TLS_PENALTY };

    (vulnerability_points + port_points + tls_points).clamp(0.0, MAX_SCORE)
}

/// Scores the report in place and returns the resulting tier.
pub fn apply_threat_model(report: &mut ScanReport) -> ThreatLevel {
    report.threat_score = calculate_threat_score(report);
    let level = ThreatLevel::from_score(report.threat_score);
    report.summary = level.summary().to_string();
    level
}

/// Derives a stable, memorable codename for a target, e.g. "Operation Silent Viper".
pub fn generate_codename(target: &str) -> String {
    let hash = stable_hash(target);
    let prefix = CODENAME_PREFIXES[(hash % CODENAME_PREFIXES.len() as u64) as usize];
    let adjective = CODENAME_ADJECTIVES[((hash / 10) % CODENAME_ADJECTIVES.len() as u64) as usize];
    let noun = CODENAME_NOUNS[((hash / 100) % CODENAME_NOUNS.len() as u64) as usize];
    format!("{prefix} {adjective} {noun}")
}

// FNV-1a: stable across platforms, processes and compiler versions, unlike `DefaultHasher`.
fn stable_hash(input: &str) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    input.bytes().fold(OFFSET_BASIS, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(PRIME))
}
