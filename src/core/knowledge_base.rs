//! Static, read-only policy data used by the scanner.
//!
//! The HTTP security-header audit is entirely data-driven: each audited header has a
//! fixed severity and remediation here, so the audit itself never computes severity.
//! The word lists used to build scan codenames also live here.

use crate::core::models::Severity;

/// Everything the header audit needs to know about one security header.
pub struct HeaderPolicy {
    /// Canonical header name, as reported to the user.
    pub name: &'static str,
    /// A token the header value must contain, if any. Compared case-insensitively.
    pub expected: Option<&'static str>,
    pub severity: Severity,
    /// What the header protects against.
    pub description: &'static str,
    pub remediation: &'static str,
}

/// The six headers audited on every scan, in audit order.
pub static SECURITY_HEADERS: &[HeaderPolicy] = &[
    HeaderPolicy {
        name: "X-Content-Type-Options",
        expected: Some("nosniff"),
        severity: Severity::Low,
        description: "Prevents MIME-sniffing.",
        remediation: "Add 'X-Content-Type-Options: nosniff' to the server configuration so browsers never guess content types.",
    },
    HeaderPolicy {
        name: "X-Frame-Options",
        expected: Some("DENY"),
        severity: Severity::Medium,
        description: "Prevents clickjacking.",
        remediation: "Add 'X-Frame-Options: DENY' to the server configuration, or use the CSP 'frame-ancestors' directive.",
    },
    HeaderPolicy {
        name: "Content-Security-Policy",
        expected: None,
        severity: Severity::High,
        description: "Mitigates XSS and data injection.",
        remediation: "Add a Content-Security-Policy header defining trusted sources for scripts, styles and other assets. Start restrictive and relax as needed.",
    },
    HeaderPolicy {
        name: "Strict-Transport-Security",
        expected: None,
        severity: Severity::High,
        description: "Enforces HTTPS and blocks protocol downgrades.",
        remediation: "Add 'Strict-Transport-Security: max-age=31536000; includeSubDomains' to HTTPS responses.",
    },
    HeaderPolicy {
        name: "Permissions-Policy",
        expected: None,
        severity: Severity::Low,
        description: "Controls which browser features the page may use.",
        remediation: "Add a Permissions-Policy header disabling features the site does not need, e.g. 'camera=(), microphone=(), geolocation=()'.",
    },
    HeaderPolicy {
        name: "Referrer-Policy",
        expected: None,
        severity: Severity::Low,
        description: "Controls how much referrer information is sent with requests.",
        remediation: "Add 'Referrer-Policy: strict-origin-when-cross-origin' (or stricter) to the server configuration.",
    },
];

/// Remediation attached to the single vulnerability raised when the target cannot be reached over HTTP or HTTPS.
pub const CONNECTIVITY_REMEDIATION: &str = "Check URL validity and verify that the target is reachable from the scanning host.";

/// Placeholder organization reported until an ASN/GeoIP source is wired in.
pub const UNKNOWN_ORGANIZATION: &str = "Unknown (no ASN data source)";

// --- Codename word lists ---

pub static CODENAME_PREFIXES: &[&str] = &["Operation", "Project", "Initiative", "Protocol"];

pub static CODENAME_ADJECTIVES: &[&str] = &[
    "Black", "Red", "Silent", "Shadow", "Crimson", "Zero", "Iron", "Ghost", "Dark", "Neon",
];

pub static CODENAME_NOUNS: &[&str] = &[
    "Wolf", "Eagle", "Storm", "Specter", "Viper", "Cobra", "Dragon", "Phoenix", "Helix", "Cipher",
];
