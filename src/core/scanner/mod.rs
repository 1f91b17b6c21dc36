// src/core/scanner/mod.rs

pub mod dns_scanner;
pub mod fingerprint_scanner;
pub mod headers_scanner;
pub mod port_scanner;
pub mod ssl_scanner;

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ScannerConfig;
use crate::core::collaborators::Collaborator;
use crate::core::error::{Phase, ScanError};
use crate::core::events::{EventSink, ScanEvent, ScanLog, Stage};
use crate::core::metrics::ScanMetrics;
use crate::core::models::{ScanReport, FAILED_SUMMARY_PREFIX};
use crate::core::scoring::apply_threat_model;
use crate::core::target::normalize_target;
use self::dns_scanner::run_dns_scan;
use self::headers_scanner::run_headers_scan;
use self::port_scanner::run_port_scan;
use self::ssl_scanner::run_ssl_scan;

/// Summary prefix used when cancellation cut the application phases short.
pub const INCOMPLETE_SUMMARY_PREFIX: &str = "Scan Incomplete";

/// Runs the scan pipeline: DNS, then ports, TLS and headers, then scoring and collaborators.
///
/// A `Scanner` is cheap to clone and can run any number of scans concurrently. The
/// only state shared between scans is the injected [`ScanMetrics`].
#[derive(Clone)]
pub struct Scanner {
    config: Arc<ScannerConfig>,
    collaborators: Vec<Arc<dyn Collaborator>>,
    metrics: Arc<ScanMetrics>,
}

impl Scanner {
    pub fn new(config: ScannerConfig) -> Self {
        Self {
            config: Arc::new(config),
            collaborators: Vec::new(),
            metrics: Arc::new(ScanMetrics::default()),
        }
    }

    /// Registers a collaborator. Collaborators run in registration order.
    pub fn with_collaborator(mut self, collaborator: impl Collaborator + 'static) -> Self {
        self.collaborators.push(Arc::new(collaborator));
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<ScanMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<ScanMetrics> {
        &self.metrics
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Scans `raw` and waits for the final report.
    ///
    /// Progress lines are discarded; use [`Scanner::spawn_scan`] to observe them.
    pub async fn scan(&self, raw: &str) -> ScanReport {
        let (sink, mut rx) = EventSink::channel();
        let _handle = self.spawn_scan(raw, sink, CancellationToken::new());

        while let Some(event) = rx.recv().await {
            if let ScanEvent::Done(report) = event {
                return *report;
            }
        }

        // Only reachable if the scan task itself was aborted from outside.
        let mut report = ScanReport::new(&normalize_target(raw));
        report.summary = format!("{FAILED_SUMMARY_PREFIX}: scan task ended without a report");
        report
    }

    /// Starts a scan on the runtime and streams its progress into `sink`.
    ///
    /// Exactly one [`ScanEvent::Done`] is sent per call, always as the scan's last
    /// event. The scan is cancelled when `cancel` fires, when the consumer drops its
    /// receiver, or when the configured scan timeout elapses. The timeout counts from
    /// this call, so time spent queued behind another scan on a shared sink is included.
    /// A scan cancelled while still queued reports without waiting for the sink.
    pub fn spawn_scan(&self, raw: &str, sink: EventSink, cancel: CancellationToken) -> JoinHandle<()> {
        let scanner = self.clone();
        let raw = raw.to_string();
        tokio::spawn(async move { scanner.drive(raw, sink, cancel).await })
    }

    async fn drive(self, raw: String, sink: EventSink, cancel: CancellationToken) {
        let target = normalize_target(&raw);
        let _active = self.metrics.begin_scan(&target);

        // The deadline and cancellation also cover the wait for the sink lease.
        let token = cancel.child_token();
        let watchdog = tokio::spawn(watch_scan(token.clone(), sink.clone(), self.config.scan_timeout()));

        let Some(log) = acquire_lease(&sink, &token).await else {
            watchdog.abort();
            warn!(target = %target, "Scan cancelled while waiting for the event sink.");
            let mut report = ScanReport::new(&target);
            report.summary = format!("{FAILED_SUMMARY_PREFIX}: {}", ScanError::Cancelled);
            self.metrics.record_failure();
            sink.finish_unleased(report);
            return;
        };
        info!(raw = %raw, target = %target, "Scan started.");

        let pipeline = tokio::spawn({
            let scanner = self.clone();
            let log = log.clone();
            let target = target.clone();
            let token = token.clone();
            async move { scanner.run_pipeline(&target, &log, &token).await }
        });

        let report = match pipeline.await {
            Ok(report) => report,
            Err(e) => {
                error!(target = %target, error = %e, "Scan pipeline task failed!");
                let mut report = ScanReport::new(&target);
                abort(&mut report, &log, format!("internal error: {e}"));
                report
            }
        };
        watchdog.abort();

        if report.is_failed() {
            self.metrics.record_failure();
        }
        info!(target = %target, score = report.threat_score, summary = %report.summary, "Scan finished.");
        log.finish(report);
    }

    async fn run_pipeline(&self, target: &str, log: &ScanLog, token: &CancellationToken) -> ScanReport {
        let config = &self.config;
        let mut report = ScanReport::new(target);

        log.emit(format!("INIT: Scan sequence started at {}", report.scan_time.to_rfc3339()));
        log.emit(format!("TARGET: {target}"));
        log.emit(format!("CODENAME: {}", report.codename));

        // --- Network ---
        log.stage(Stage::Network, "Initiating Network Reconnaissance...");
        let dns = until_cancelled(token, run_dns_scan(target, config, log))
            .await
            .unwrap_or(Err(ScanError::Cancelled));
        let dns = match dns {
            Ok(dns) => dns,
            Err(e) => {
                abort(&mut report, log, e);
                return report;
            }
        };
        report.ip_info = dns.ip_info;
        report.dns_info = dns.dns_info;
        log.emit(format!("✔ DNS MAPPING COMPLETE ({} records found)", report.dns_info.record_count()));

        // --- Application ---
        log.stage(Stage::App, "Initiating Application Layer Analysis...");
        let mut interrupted = None;

        log.emit("... Scanning common ports");
        let ports = run_port_scan(
            dns.primary_address,
            &config.ports,
            config.probe_timeout(),
            config.probe_concurrency,
            log,
        );
        match until_cancelled(token, ports).await {
            Some(open_ports) => report.open_ports = open_ports,
            None => interrupted = Some(Phase::Ports),
        }

        if interrupted.is_none() {
            log.emit("... Analyzing SSL/TLS Configuration");
            let tls = run_ssl_scan(target, config.tls_port, config.tls_timeout(), log);
            match until_cancelled(token, tls).await {
                Some(Ok(ssl_info)) => report.ssl_info = ssl_info,
                Some(Err(e)) => {
                    warn!(target, error = %e, "TLS inspection failed.");
                    log.emit(format!("⚠ SSL ANALYSIS FAILED: {e}"));
                }
                None => interrupted = Some(Phase::Tls),
            }
        }

        if interrupted.is_none() {
            log.emit("... Fingerprinting Technology Stack");
            match until_cancelled(token, run_headers_scan(target, config, log)).await {
                Some(headers) => {
                    report.tech_stack = headers.tech_stack;
                    report.vulnerabilities.extend(headers.vulnerabilities);
                }
                None => interrupted = Some(Phase::Http),
            }
        }

        // --- Security ---
        log.stage(Stage::Security, "Initiating Threat Assessment...");
        log.emit("... Calculating Threat Model");
        let level = apply_threat_model(&mut report);
        log.emit(format!("✔ THREAT SCORE: {}/100", report.threat_score));
        debug!(%level, score = report.threat_score, "Threat model applied.");

        for collaborator in &self.collaborators {
            let name = collaborator.name().to_string();
            let blob = self.run_collaborator(collaborator, target, log, token).await;
            report.extensions.insert(name, blob);
        }

        match interrupted {
            Some(phase) => {
                warn!(target, %phase, "Scan cancelled after network phase.");
                report.summary = format!(
                    "{INCOMPLETE_SUMMARY_PREFIX}: cancelled during {phase}, later phases skipped. {}",
                    level.summary()
                );
                log.stage(Stage::Security, "Scan Cancelled. Partial results scored.");
            }
            None => log.stage(Stage::Security, "Scan Completed Successfully."),
        }

        report
    }

    /// Runs one collaborator on its own task, so a panic inside it only costs its blob.
    async fn run_collaborator(
        &self,
        collaborator: &Arc<dyn Collaborator>,
        target: &str,
        log: &ScanLog,
        token: &CancellationToken,
    ) -> Value {
        let name = collaborator.name().to_string();
        let mut task = tokio::spawn({
            let collaborator = Arc::clone(collaborator);
            let target = target.to_string();
            let log = log.clone();
            async move { collaborator.run(&target, &log).await }
        });

        let outcome = tokio::time::timeout(self.config.collaborator_timeout(), until_cancelled(token, &mut task)).await;
        match outcome {
            Ok(Some(Ok(blob))) => blob,
            Ok(Some(Err(e))) => {
                error!(collaborator = %name, error = %e, "Collaborator task failed!");
                log.emit(format!("⚠ {name} failed"));
                Value::Null
            }
            Ok(None) => {
                task.abort();
                debug!(collaborator = %name, "Collaborator skipped, scan cancelled.");
                Value::Null
            }
            Err(_) => {
                task.abort();
                warn!(collaborator = %name, "Collaborator timed out.");
                log.emit(format!("⚠ {name} timed out"));
                Value::Null
            }
        }
    }
}

/// Drives `fut` unless `token` fires first. A token that is already cancelled wins
/// even over a future that would complete on its first poll.
async fn until_cancelled<F: Future>(token: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = token.cancelled() => None,
        output = fut => Some(output),
    }
}

/// Takes the sink lease unless `token` fires first. A free lease is always taken,
/// even by a scan that is already cancelled.
async fn acquire_lease(sink: &EventSink, token: &CancellationToken) -> Option<ScanLog> {
    tokio::select! {
        biased;
        log = sink.lease() => Some(log),
        _ = token.cancelled() => None,
    }
}

/// Cancels `token` once the scan outlives `scan_timeout` or the consumer goes away.
async fn watch_scan(token: CancellationToken, sink: EventSink, scan_timeout: std::time::Duration) {
    tokio::select! {
        _ = token.cancelled() => {}
        _ = tokio::time::sleep(scan_timeout) => {
            warn!(timeout = ?scan_timeout, "Scan timeout reached, cancelling.");
            token.cancel();
        }
        _ = sink.closed() => {
            debug!("Event consumer disconnected, cancelling scan.");
            token.cancel();
        }
    }
}

fn abort(report: &mut ScanReport, log: &ScanLog, cause: impl Display) {
    error!(target = %report.target, cause = %cause, "Scan aborted.");
    log.emit(format!("CRITICAL FAILURE: {cause}"));
    report.threat_score = 0.0;
    report.summary = format!("{FAILED_SUMMARY_PREFIX}: {cause}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Fixed;

    #[async_trait]
    impl Collaborator for Fixed {
        fn name(&self) -> &str {
            "osint"
        }

        async fn run(&self, _target: &str, log: &ScanLog) -> Value {
            log.emit("osint ran");
            json!({ "breaches": 0 })
        }
    }

    struct Stalls;

    #[async_trait]
    impl Collaborator for Stalls {
        fn name(&self) -> &str {
            "slow"
        }

        async fn run(&self, _target: &str, _log: &ScanLog) -> Value {
            tokio::time::sleep(Duration::from_secs(60)).await;
            json!("never")
        }
    }

    struct Panics;

    #[async_trait]
    impl Collaborator for Panics {
        fn name(&self) -> &str {
            "broken"
        }

        async fn run(&self, _target: &str, _log: &ScanLog) -> Value {
            panic!("collaborator blew up");
        }
    }

    fn closed_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    /// A config whose every network phase fails fast against localhost.
    fn offline_config() -> ScannerConfig {
        let port = closed_port();
        ScannerConfig {
            ports: vec![port],
            tls_port: port,
            tls_timeout_secs: 1,
            http_port: port,
            https_port: port,
            http_timeout_secs: 2,
            collaborator_timeout_secs: 1,
            ..ScannerConfig::default()
        }
    }

    async fn collect(mut rx: UnboundedReceiver<ScanEvent>) -> (Vec<String>, Vec<ScanReport>) {
        let mut lines = Vec::new();
        let mut reports = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                ScanEvent::Progress(line) => lines.push(line),
                ScanEvent::Done(report) => reports.push(*report),
            }
        }
        (lines, reports)
    }

    #[tokio::test]
    async fn empty_input_fails_with_zero_score() {
        let report = Scanner::new(ScannerConfig::default()).scan("   ").await;
        assert!(report.is_failed());
        assert_eq!(report.threat_score, 0.0);
        assert!(report.open_ports.is_empty());
        assert!(report.vulnerabilities.is_empty());
    }

    #[tokio::test]
    async fn cancelled_before_start_is_a_failed_scan() {
        let scanner = Scanner::new(offline_config());
        let (sink, rx) = EventSink::channel();
        let cancel = CancellationToken::new();
        cancel.cancel();

        scanner.spawn_scan("127.0.0.1", sink, cancel).await.unwrap();
        let (lines, reports) = collect(rx).await;

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].summary, "Scan Failed: scan cancelled");
        assert!(lines.iter().any(|l| l == "CRITICAL FAILURE: scan cancelled"));
    }

    #[tokio::test]
    async fn collaborators_run_after_scoring_and_timeouts_store_null() {
        let scanner = Scanner::new(offline_config()).with_collaborator(Fixed).with_collaborator(Stalls);
        let (sink, rx) = EventSink::channel();
        scanner.spawn_scan("127.0.0.1", sink, CancellationToken::new()).await.unwrap();
        let (lines, reports) = collect(rx).await;

        let report = &reports[0];
        assert_eq!(report.extensions.get("osint"), Some(&json!({ "breaches": 0 })));
        assert_eq!(report.extensions.get("slow"), Some(&Value::Null));

        let score_line = lines.iter().position(|l| l.starts_with("✔ THREAT SCORE")).unwrap();
        let osint_line = lines.iter().position(|l| l == "osint ran").unwrap();
        assert!(score_line < osint_line);
    }

    #[tokio::test]
    async fn panicking_collaborator_keeps_the_scored_report() {
        let scanner = Scanner::new(offline_config()).with_collaborator(Panics).with_collaborator(Fixed);
        let (sink, rx) = EventSink::channel();
        scanner.spawn_scan("127.0.0.1", sink, CancellationToken::new()).await.unwrap();
        let (lines, reports) = collect(rx).await;

        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert!(!report.is_failed());
        assert!(report.threat_score > 0.0);
        assert_eq!(report.extensions.get("broken"), Some(&Value::Null));
        assert_eq!(report.extensions.get("osint"), Some(&json!({ "breaches": 0 })));
        assert!(lines.iter().any(|l| l == "⚠ broken failed"));
        assert_eq!(lines.last().map(String::as_str), Some("[STAGE:SECURITY] Scan Completed Successfully."));
        assert_eq!(scanner.metrics().failed_scans(), 0);
        assert_eq!(scanner.metrics().active_scans(), 0);
    }

    #[tokio::test]
    async fn scan_timeout_covers_the_wait_for_a_busy_sink() {
        let config = ScannerConfig { scan_timeout_secs: 1, ..offline_config() };
        let scanner = Scanner::new(config);
        let (sink, mut rx) = EventSink::channel();
        let held = sink.lease().await;

        let started = std::time::Instant::now();
        scanner.spawn_scan("127.0.0.1", sink, CancellationToken::new()).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(3));

        match rx.try_recv() {
            Ok(ScanEvent::Done(report)) => {
                assert_eq!(report.target, "127.0.0.1");
                assert_eq!(report.summary, "Scan Failed: scan cancelled");
                assert_eq!(report.threat_score, 0.0);
            }
            other => panic!("expected a lone report, got {other:?}"),
        }
        assert_eq!(scanner.metrics().failed_scans(), 1);
        assert_eq!(scanner.metrics().active_scans(), 0);
        drop(held);
    }

    #[tokio::test]
    async fn scan_timeout_still_yields_a_scored_report() {
        let config = ScannerConfig { scan_timeout_secs: 1, collaborator_timeout_secs: 30, ..offline_config() };
        let scanner = Scanner::new(config).with_collaborator(Stalls);
        let (sink, rx) = EventSink::channel();
        scanner.spawn_scan("127.0.0.1", sink, CancellationToken::new()).await.unwrap();
        let (_, reports) = collect(rx).await;

        let report = &reports[0];
        assert!(!report.is_failed());
        assert_eq!(report.extensions.get("slow"), Some(&Value::Null));
        assert!(report.threat_score > 0.0);
    }
}
