// src/core/scanner/ssl_scanner.rs

use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::core::error::{Phase, ScanError};
use crate::core::events::ScanLog;
use crate::core::models::SslInfo;
use chrono::{DateTime, Utc};
use native_tls::TlsConnector;
use tokio::task::spawn_blocking;
use x509_parser::objects::{oid2sn, oid_registry};
use x509_parser::prelude::*;

/// A TLS connector that accepts any certificate chain and any hostname.
///
/// This exists only to *read* the peer's leaf certificate. It authenticates
/// nothing, so it is private to this module and must never back a connection
/// whose contents are trusted.
struct InspectionConnector(TlsConnector);

impl InspectionConnector {
    fn new() -> Result<Self, native_tls::Error> {
        TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .map(Self)
    }
}

/// Performs an inspection-only TLS handshake with `target:port` and reads its leaf certificate.
///
/// The handshake runs on the blocking pool. The whole operation is bounded by
/// `io_timeout` (plus a small grace period), so a hung peer cannot stall the pipeline.
pub async fn run_ssl_scan(target: &str, port: u16, io_timeout: Duration, log: &ScanLog) -> Result<SslInfo, ScanError> {
    info!(target, port, "Starting SSL/TLS scan.");
    let target_owned = target.to_string();

    debug!("Spawning blocking task for TLS connection.");
    let task = spawn_blocking(move || perform_tls_scan(&target_owned, port, io_timeout));

    // Connect and handshake each get `io_timeout`; an absurd config value saturates.
    let deadline = io_timeout.saturating_mul(2).saturating_add(Duration::from_secs(1));
    let info = match tokio::time::timeout(deadline, task).await {
        Ok(Ok(result)) => result?,
        Ok(Err(e)) => {
            error!(panic = %e, "Blocking SSL scan task panicked!");
            return Err(ScanError::phase(Phase::Tls, format!("task panicked: {e}")));
        }
        Err(_) => {
            warn!(target, "TLS inspection exceeded its deadline.");
            return Err(ScanError::phase(Phase::Tls, "handshake timed out"));
        }
    };

    log.emit(format!("✔ SSL CERT: {}", info.subject));
    log.emit(format!("  Issuer: {}", info.issuer));
    if let Some(days) = info.days_until_expiry {
        if days < 0 {
            log.emit(format!("⚠ SSL CERT EXPIRED {} days ago", -days));
        }
    }

    info!(valid = info.valid, "SSL/TLS scan finished.");
    Ok(info)
}

fn perform_tls_scan(target: &str, port: u16, io_timeout: Duration) -> Result<SslInfo, ScanError> {
    let tls_error = |reason: String| ScanError::phase(Phase::Tls, reason);

    let connector = InspectionConnector::new().map_err(|e| {
        error!(error = %e, "Failed to create TlsConnector");
        tls_error(format!("TlsConnector error: {e}"))
    })?;

    debug!(target, port, "Connecting TCP stream.");
    let stream = connect_with_timeout(target, port, io_timeout).map_err(|e| {
        debug!(error = %e, "TCP connection failed");
        tls_error(format!("TCP connection error: {e}"))
    })?;

    debug!(target, "Performing TLS handshake.");
    let stream = connector.0.connect(target, stream).map_err(|e| {
        debug!(error = %e, "TLS handshake failed");
        tls_error(format!("TLS handshake error: {e}"))
    })?;

    let cert = stream
        .peer_certificate()
        .map_err(|e| tls_error(format!("could not get peer certificate: {e}")))?
        .ok_or_else(|| tls_error("server did not present a certificate".to_string()))?;

    let cert_der = cert
        .to_der()
        .map_err(|e| tls_error(format!("could not convert certificate to DER: {e}")))?;

    let (_, x509) = parse_x509_certificate(&cert_der).map_err(|e| {
        error!(error = %e, "Failed to parse X.509 certificate");
        tls_error(format!("X.509 parse error: {e}"))
    })?;

    info!(subject = %x509.subject(), issuer = %x509.issuer(), "Successfully parsed certificate.");

    let not_after = asn1_time_to_chrono_utc(&x509.validity().not_after);
    let algorithm_oid = &x509.signature_algorithm.algorithm;
    let algorithm = oid2sn(algorithm_oid, oid_registry())
        .map(str::to_string)
        .unwrap_or_else(|_| algorithm_oid.to_id_string());

    Ok(SslInfo {
        valid: true,
        issuer: x509.issuer().to_string(),
        subject: x509.subject().to_string(),
        algorithm,
        expires_on: Some(not_after),
        days_until_expiry: Some(not_after.signed_duration_since(Utc::now()).num_days()),
    })
}

fn connect_with_timeout(target: &str, port: u16, io_timeout: Duration) -> io::Result<TcpStream> {
    let addrs: Vec<SocketAddr> = (target, port).to_socket_addrs()?.collect();
    let mut last_error = io::Error::new(io::ErrorKind::NotFound, "no addresses to connect to");

    for addr in addrs {
        match TcpStream::connect_timeout(&addr, io_timeout) {
            Ok(stream) => {
                stream.set_read_timeout(Some(io_timeout))?;
                stream.set_write_timeout(Some(io_timeout))?;
                return Ok(stream);
            }
            Err(e) => last_error = e,
        }
    }
    Err(last_error)
}

fn asn1_time_to_chrono_utc(time: &ASN1Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::{EventSink, ScanEvent};
    use chrono::Datelike;
    use native_tls::{Identity, TlsAcceptor};
    use rcgen::{CertificateParams, DnType, KeyPair};
    use std::net::TcpListener;

    /// Serves a single handshake with a self-signed certificate valid from Jan 1st of
    /// `not_before` to Jan 1st of `not_after`.
    fn self_signed_peer(not_before: i32, not_after: i32) -> u16 {
        let mut params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
        params.distinguished_name.push(DnType::CommonName, "netspecter.test");
        params.not_before = rcgen::date_time_ymd(not_before, 1, 1);
        params.not_after = rcgen::date_time_ymd(not_after, 1, 1);
        let key_pair = KeyPair::generate().unwrap();
        let cert = params.self_signed(&key_pair).unwrap();
        let identity = Identity::from_pkcs8(cert.pem().as_bytes(), key_pair.serialize_pem().as_bytes()).unwrap();
        let acceptor = TlsAcceptor::new(identity).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        std::thread::spawn(move || {
            if let Ok((socket, _)) = listener.accept() {
                let _ = acceptor.accept(socket);
            }
        });
        port
    }

    fn lines(rx: &mut tokio::sync::mpsc::UnboundedReceiver<ScanEvent>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(ScanEvent::Progress(line)) = rx.try_recv() {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn inspection_connector_builds() {
        assert!(InspectionConnector::new().is_ok());
    }

    #[tokio::test]
    async fn refused_connection_is_a_tls_phase_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let (sink, _rx) = EventSink::channel();
        let log = sink.lease().await;

        let err = run_ssl_scan("127.0.0.1", port, Duration::from_secs(1), &log).await.unwrap_err();
        assert!(matches!(err, ScanError::Phase { phase: Phase::Tls, .. }));
    }

    #[tokio::test]
    async fn plaintext_peer_fails_the_handshake() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        std::thread::spawn(move || {
            use std::io::Write;
            if let Ok((mut socket, _)) = listener.accept() {
                let _ = socket.write_all(b"HTTP/1.1 400 Bad Request\r\n\r\n");
            }
        });

        let (sink, _rx) = EventSink::channel();
        let log = sink.lease().await;
        let result = run_ssl_scan("127.0.0.1", port, Duration::from_secs(2), &log).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn silent_peer_cannot_stall_the_scan() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let (sink, _rx) = EventSink::channel();
        let log = sink.lease().await;
        let started = std::time::Instant::now();
        let result = run_ssl_scan("127.0.0.1", port, Duration::from_millis(300), &log).await;

        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(3));
        drop(listener);
    }

    #[tokio::test]
    async fn self_signed_certificate_is_read_in_full() {
        let port = self_signed_peer(2020, 2099);
        let (sink, mut rx) = EventSink::channel();
        let log = sink.lease().await;

        let info = run_ssl_scan("127.0.0.1", port, Duration::from_secs(2), &log).await.unwrap();
        assert!(info.valid);
        assert!(info.subject.contains("netspecter.test"));
        assert_eq!(info.issuer, info.subject);
        assert!(!info.algorithm.is_empty());
        assert_eq!(info.expires_on.map(|d| d.year()), Some(2099));
        assert!(info.days_until_expiry.is_some_and(|days| days > 0));

        let lines = lines(&mut rx);
        assert_eq!(lines[0], format!("✔ SSL CERT: {}", info.subject));
        assert_eq!(lines[1], format!("  Issuer: {}", info.issuer));
        assert!(!lines.iter().any(|l| l.contains("EXPIRED")));
    }

    #[tokio::test]
    async fn expired_certificate_is_still_inspected_and_flagged() {
        let port = self_signed_peer(2000, 2001);
        let (sink, mut rx) = EventSink::channel();
        let log = sink.lease().await;

        let info = run_ssl_scan("127.0.0.1", port, Duration::from_secs(2), &log).await.unwrap();
        assert!(info.valid);
        let days = info.days_until_expiry.unwrap();
        assert!(days < 0);
        assert!(lines(&mut rx).contains(&format!("⚠ SSL CERT EXPIRED {} days ago", -days)));
    }

    #[tokio::test]
    async fn huge_timeout_does_not_overflow_the_deadline() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let (sink, _rx) = EventSink::channel();
        let log = sink.lease().await;

        let result = run_ssl_scan("127.0.0.1", port, Duration::from_secs(u64::MAX), &log).await;
        assert!(matches!(result, Err(ScanError::Phase { phase: Phase::Tls, .. })));
    }
}
