// src/core/models.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::core::scoring::generate_codename;

// --- Core Data Models ---

/// The severity level of a vulnerability.
///
/// Variants are ordered from least to most severe, so `Severity::Low < Severity::Critical`.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString,
)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// The number of threat points a single finding of this severity contributes.
    pub fn weight(self) -> f64 {
        match self {
            Severity::Critical => 25.0,
            Severity::High => 15.0,
            Severity::Medium => 10.0,
            Severity::Low => 5.0,
        }
    }
}

/// A single security finding attached to the report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vulnerability {
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    pub description: String,
    pub remediation: String,
}

impl Vulnerability {
    pub fn new(kind: &str, severity: Severity, description: impl Into<String>, remediation: impl Into<String>) -> Self {
        Self {
            kind: kind.to_string(),
            severity,
            description: description.into(),
            remediation: remediation.into(),
        }
    }
}

// --- Network Phase Models ---

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IpInfo {
    pub address: String,
    pub hostname: String,
    pub organization: String,
}

/// Record sets gathered during DNS enumeration, kept in resolver response order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DnsInfo {
    pub a_records: Vec<String>,
    pub mx_records: Vec<String>,
    pub txt_records: Vec<String>,
}

impl DnsInfo {
    pub fn record_count(&self) -> usize {
        self.a_records.len() + self.mx_records.len() + self.txt_records.len()
    }
}

// --- Application Phase Models ---

/// Leaf-certificate metadata read during TLS inspection.
///
/// `valid` only states that a handshake completed and a certificate could be read;
/// it says nothing about chain trust.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SslInfo {
    pub valid: bool,
    pub issuer: String,
    pub subject: String,
    pub algorithm: String,
    pub expires_on: Option<DateTime<Utc>>,
    pub days_until_expiry: Option<i64>,
}

// --- Main Report ---

/// The aggregate result of one scan.
///
/// Every collection is initialized at construction so serialized reports always
/// carry every field. Collaborator blobs are flattened into the top level, one key
/// per collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub target: String,
    pub scan_time: DateTime<Utc>,
    pub codename: String,
    pub ip_info: IpInfo,
    pub dns_info: DnsInfo,
    pub open_ports: Vec<u16>,
    pub ssl_info: SslInfo,
    pub tech_stack: Vec<String>,
    pub vulnerabilities: Vec<Vulnerability>,
    pub threat_score: f64,
    pub summary: String,
    #[serde(flatten)]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

impl ScanReport {
    /// Creates an empty report for an already-normalized target.
    pub fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
            scan_time: Utc::now(),
            codename: generate_codename(target),
            ..Default::default()
        }
    }

    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.vulnerabilities.iter().filter(|v| v.severity == severity).count()
    }

    pub fn is_failed(&self) -> bool {
        self.summary.starts_with(FAILED_SUMMARY_PREFIX)
    }
}

/// Summary prefix used when the pipeline aborts before scoring.
pub const FAILED_SUMMARY_PREFIX: &str = "Scan Failed";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_serializes_every_collection() {
        let report = ScanReport::new("example.com");
        let json = serde_json::to_value(&report).unwrap();

        for key in ["openPorts", "techStack", "vulnerabilities"] {
            assert!(json[key].as_array().is_some_and(|a| a.is_empty()), "{key} missing");
        }
        assert!(json["dnsInfo"]["aRecords"].is_array());
        assert!(json["dnsInfo"]["mxRecords"].is_array());
        assert!(json["dnsInfo"]["txtRecords"].is_array());
        assert_eq!(json["sslInfo"]["valid"], false);
        assert_eq!(json["ipInfo"]["address"], "");
    }

    #[test]
    fn extensions_are_flattened_under_their_own_key() {
        let mut report = ScanReport::new("example.com");
        report.extensions.insert("geoTrace".into(), serde_json::json!({"hops": 5}));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["geoTrace"]["hops"], 5);

        let back: ScanReport = serde_json::from_value(json).unwrap();
        assert_eq!(back.extensions["geoTrace"]["hops"], 5);
    }

    #[test]
    fn vulnerability_kind_serializes_as_type() {
        let v = Vulnerability::new("Connectivity", Severity::Critical, "down", "Check URL validity");
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["type"], "Connectivity");
        assert_eq!(json["severity"], "Critical");
    }
}
