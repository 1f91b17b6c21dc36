// src/core/scanner/dns_scanner.rs

use std::net::IpAddr;

use tracing::{debug, info, warn};

use crate::config::ScannerConfig;
use crate::core::error::ScanError;
use crate::core::events::ScanLog;
use crate::core::knowledge_base::UNKNOWN_ORGANIZATION;
use crate::core::models::{DnsInfo, IpInfo};
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::system_conf::read_system_conf;
use hickory_resolver::TokioAsyncResolver;

/// Everything the network phase contributes to the report.
#[derive(Debug, Clone)]
pub struct DnsResults {
    /// The address every later network phase connects to.
    pub primary_address: IpAddr,
    pub ip_info: IpInfo,
    pub dns_info: DnsInfo,
}

/// Resolves the target's primary address, then enumerates its A, MX and TXT records.
///
/// Failing to resolve the primary address is the only error this phase returns and
/// is fatal for the scan. Each record-set query is best-effort: a failed or empty
/// lookup leaves that sequence empty.
///
/// IP literals are taken as-is and skip record enumeration entirely.
pub async fn run_dns_scan(target: &str, config: &ScannerConfig, log: &ScanLog) -> Result<DnsResults, ScanError> {
    info!(target, "Starting DNS scan.");

    if target.is_empty() {
        return Err(ScanError::Resolution {
            target: String::new(),
            reason: "no target given".to_string(),
        });
    }

    if let Ok(address) = target.parse::<IpAddr>() {
        debug!(%address, "Target is an IP literal, skipping record enumeration.");
        log.emit(format!("✔ IP RESOLVED: {address}"));
        let dns_info = DnsInfo {
            a_records: if address.is_ipv4() { vec![address.to_string()] } else { Vec::new() },
            ..Default::default()
        };
        return Ok(DnsResults {
            primary_address: address,
            ip_info: ip_info_for(target, address),
            dns_info,
        });
    }

    let resolver = build_resolver(config);

    let primary_address = resolve_primary_address(&resolver, target).await?;
    log.emit(format!("✔ IP RESOLVED: {primary_address}"));

    log.emit("... Enumerating DNS records");
    let (a_records, mx_records, txt_records) = tokio::join!(
        lookup_a(&resolver, target),
        lookup_mx(&resolver, target),
        lookup_txt(&resolver, target)
    );

    let dns_info = DnsInfo { a_records, mx_records, txt_records };
    info!(records = dns_info.record_count(), "DNS scan finished.");

    Ok(DnsResults {
        primary_address,
        ip_info: ip_info_for(target, primary_address),
        dns_info,
    })
}

/// Builds a resolver from the host's system configuration, falling back to the
/// public defaults when it cannot be read.
pub fn build_resolver(config: &ScannerConfig) -> TokioAsyncResolver {
    let (resolver_config, mut opts) = if config.use_system_resolver {
        read_system_conf().unwrap_or_else(|e| {
            warn!(error = %e, "Could not read system resolver configuration, using defaults.");
            (ResolverConfig::default(), ResolverOpts::default())
        })
    } else {
        (ResolverConfig::default(), ResolverOpts::default())
    };
    opts.timeout = config.dns_timeout();
    opts.attempts = config.dns_attempts.max(1);

    TokioAsyncResolver::tokio(resolver_config, opts)
}

fn ip_info_for(target: &str, address: IpAddr) -> IpInfo {
    IpInfo {
        address: address.to_string(),
        hostname: target.to_string(),
        organization: UNKNOWN_ORGANIZATION.to_string(),
    }
}

async fn resolve_primary_address(resolver: &TokioAsyncResolver, target: &str) -> Result<IpAddr, ScanError> {
    debug!(target, "Resolving primary address.");
    let lookup = resolver.lookup_ip(target).await.map_err(|e| {
        warn!(target, error = %e, "Primary address lookup failed.");
        ScanError::Resolution { target: target.to_string(), reason: e.to_string() }
    })?;

    lookup.iter().next().ok_or_else(|| ScanError::Resolution {
        target: target.to_string(),
        reason: "no addresses returned".to_string(),
    })
}

async fn lookup_a(resolver: &TokioAsyncResolver, target: &str) -> Vec<String> {
    debug!(target, "Looking up A records.");
    match resolver.ipv4_lookup(target).await {
        Ok(lookup) => lookup.iter().map(|r| r.to_string()).collect(),
        Err(e) => {
            warn!(target, error = %e, "A lookup failed.");
            Vec::new()
        }
    }
}

async fn lookup_mx(resolver: &TokioAsyncResolver, target: &str) -> Vec<String> {
    debug!(target, "Looking up MX records.");
    match resolver.mx_lookup(target).await {
        Ok(lookup) => lookup.iter().map(|r| r.to_string()).collect(),
        Err(e) => {
            // Plenty of hosts have no mail exchanger at all.
            debug!(target, error = %e, "MX lookup returned nothing.");
            Vec::new()
        }
    }
}

async fn lookup_txt(resolver: &TokioAsyncResolver, target: &str) -> Vec<String> {
    debug!(target, "Looking up TXT records.");
    match resolver.txt_lookup(target).await {
        Ok(lookup) => lookup.iter().map(|r| r.to_string()).collect(),
        Err(e) => {
            debug!(target, error = %e, "TXT lookup returned nothing.");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::EventSink;

    #[tokio::test]
    async fn empty_target_is_a_resolution_error() {
        let (sink, _rx) = EventSink::channel();
        let log = sink.lease().await;
        let err = run_dns_scan("", &ScannerConfig::default(), &log).await.unwrap_err();
        assert!(matches!(err, ScanError::Resolution { .. }));
    }

    #[tokio::test]
    async fn ipv4_literal_resolves_without_queries() {
        let (sink, _rx) = EventSink::channel();
        let log = sink.lease().await;
        let results = run_dns_scan("127.0.0.1", &ScannerConfig::default(), &log).await.unwrap();

        assert_eq!(results.primary_address, "127.0.0.1".parse::<IpAddr>().unwrap());
        assert_eq!(results.ip_info.address, "127.0.0.1");
        assert_eq!(results.dns_info.a_records, vec!["127.0.0.1".to_string()]);
        assert!(results.dns_info.mx_records.is_empty());
        assert!(results.dns_info.txt_records.is_empty());
    }

    #[tokio::test]
    async fn ipv6_literal_has_no_a_record() {
        let (sink, _rx) = EventSink::channel();
        let log = sink.lease().await;
        let results = run_dns_scan("::1", &ScannerConfig::default(), &log).await.unwrap();
        assert!(results.primary_address.is_ipv6());
        assert!(results.dns_info.a_records.is_empty());
    }
}
