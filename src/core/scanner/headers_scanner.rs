// src/core/scanner/headers_scanner.rs

use std::net::Ipv6Addr;

use tracing::{debug, error, info, warn};
use crate::config::ScannerConfig;
use crate::core::events::ScanLog;
use crate::core::knowledge_base::{CONNECTIVITY_REMEDIATION, SECURITY_HEADERS};
use crate::core::models::{Severity, Vulnerability};
use crate::core::scanner::fingerprint_scanner::detect_technologies;
use reqwest::header::{HeaderMap, LOCATION, SERVER};
use reqwest::redirect::Policy;
use reqwest::{Client, Response};
use url::Url;

/// What the HTTP phase contributes to the report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadersResults {
    pub tech_stack: Vec<String>,
    pub vulnerabilities: Vec<Vulnerability>,
}

/// Fingerprints the target's web server and audits its security headers.
///
/// A HEAD request goes out over plain HTTP first; a redirect to HTTPS is followed
/// once. If that fails, one HEAD request is tried directly over HTTPS. When both
/// fail, a single `Connectivity` vulnerability is returned instead of an error.
pub async fn run_headers_scan(target: &str, config: &ScannerConfig, log: &ScanLog) -> HeadersResults {
    info!(target, "Starting headers scan.");

    let client = match build_client(config) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "Failed to build HTTP client for headers scan.");
            return connectivity_failure(log, format!("Failed to build HTTP client: {e}"));
        }
    };

    let http_url = build_url("http", target, config.http_port, 80);
    log.emit("Connecting via HTTP...");

    let response = match fetch_over_http(&client, &http_url, log).await {
        Ok(response) => response,
        Err(e) => {
            warn!(url = %http_url, error = %e, "HTTP request failed, falling back to HTTPS.");
            log.emit("HTTP connection failed. Trying direct HTTPS...");
            let https_url = build_url("https", target, config.https_port, 443);
            match client.head(&https_url).send().await {
                Ok(response) => {
                    log.emit(format!("HTTPS Response: {}", response.status()));
                    response
                }
                Err(e) => {
                    error!(url = %https_url, error = %e, "HTTPS request failed for headers scan.");
                    return connectivity_failure(log, format!("Connection failed: {e}"));
                }
            }
        }
    };

    let headers = response.headers();
    let mut results = HeadersResults::default();

    if let Some(server) = headers.get(SERVER) {
        let server = String::from_utf8_lossy(server.as_bytes());
        log.emit(format!("ℹ DETECTED TECH: {server}"));
        results.tech_stack.push(format!("Server: {server}"));
    }
    if let Some(powered_by) = headers.get("x-powered-by") {
        let powered_by = String::from_utf8_lossy(powered_by.as_bytes());
        log.emit(format!("ℹ DETECTED TECH: {powered_by}"));
        results.tech_stack.push(format!("Framework: {powered_by}"));
    }
    for label in detect_technologies(headers) {
        if !results.tech_stack.contains(&label) {
            log.emit(format!("ℹ DETECTED TECH: {label}"));
            results.tech_stack.push(label);
        }
    }

    results.vulnerabilities = audit_security_headers(headers);
    info!(findings = %results.vulnerabilities.len(), "Headers scan finished.");
    results
}

/// Checks the six audited security headers against the static policy table.
///
/// A missing header yields `Missing Security Header`; a present header lacking its
/// expected token yields `Misconfigured Security Header`. Severity and remediation
/// come from the table, never from the response.
pub fn audit_security_headers(headers: &HeaderMap) -> Vec<Vulnerability> {
    debug!("Analyzing collected header data.");
    let mut findings = Vec::new();

    for policy in SECURITY_HEADERS {
        match headers.get(policy.name) {
            None => {
                debug!(header = policy.name, "Header missing.");
                findings.push(Vulnerability::new(
                    "Missing Security Header",
                    policy.severity,
                    format!("Missing {}. {}", policy.name, policy.description),
                    policy.remediation,
                ));
            }
            Some(value) => {
                let value = String::from_utf8_lossy(value.as_bytes());
                if let Some(expected) = policy.expected {
                    if !value.to_ascii_lowercase().contains(&expected.to_ascii_lowercase()) {
                        debug!(header = policy.name, %value, "Header misconfigured.");
                        findings.push(Vulnerability::new(
                            "Misconfigured Security Header",
                            policy.severity,
                            format!("{} is set to '{}' but should contain '{}'. {}", policy.name, value, expected, policy.description),
                            policy.remediation,
                        ));
                    }
                }
            }
        }
    }

    findings
}

fn build_client(config: &ScannerConfig) -> reqwest::Result<Client> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.clone())
        .redirect(Policy::none())
        .connect_timeout(config.http_timeout())
        .timeout(config.http_timeout());
    if !config.use_system_proxy {
        builder = builder.no_proxy();
    }
    if config.accept_invalid_certs {
        warn!("Certificate validation disabled for the headers scan.");
        builder = builder.danger_accept_invalid_certs(true);
    }
    builder.build()
}

/// Sends a HEAD request over HTTP and follows a single redirect if it points at HTTPS.
async fn fetch_over_http(client: &Client, http_url: &str, log: &ScanLog) -> reqwest::Result<Response> {
    let response = client.head(http_url).send().await?;
    log.emit(format!("HTTP Response: {}", response.status()));

    if !response.status().is_redirection() {
        return Ok(response);
    }

    let redirect = response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|location| Url::parse(http_url).ok()?.join(location).ok())
        .filter(|url| url.scheme() == "https");

    match redirect {
        Some(url) => {
            log.emit("Following redirect to HTTPS...");
            debug!(%url, "Following redirect.");
            client.head(url).send().await
        }
        None => Ok(response),
    }
}

fn build_url(scheme: &str, target: &str, port: u16, default_port: u16) -> String {
    let host = if target.parse::<Ipv6Addr>().is_ok() {
        format!("[{target}]")
    } else {
        target.to_string()
    };

    if port == default_port {
        format!("{scheme}://{host}")
    } else {
        format!("{scheme}://{host}:{port}")
    }
}

fn connectivity_failure(log: &ScanLog, error: String) -> HeadersResults {
    log.emit(format!("❌ {error}"));
    HeadersResults {
        tech_stack: Vec::new(),
        vulnerabilities: vec![Vulnerability::new("Connectivity", Severity::Critical, error, CONNECTIVITY_REMEDIATION)],
    }
}
