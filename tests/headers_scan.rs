use std::io::{Read, Write};
use std::net::TcpListener;

use native_tls::{Identity, TlsAcceptor};
use netspecter_rs::config::ScannerConfig;
use netspecter_rs::core::events::{EventSink, ScanEvent};
use netspecter_rs::core::knowledge_base::CONNECTIVITY_REMEDIATION;
use netspecter_rs::core::models::Severity;
use netspecter_rs::core::scanner::headers_scanner::{run_headers_scan, HeadersResults};
use rcgen::{CertificateParams, KeyPair};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Answers every request on a self-signed HTTPS endpoint with `200 OK` plus `headers`.
fn https_server(headers: &'static str) -> u16 {
    let params = CertificateParams::new(vec!["localhost".to_string(), "127.0.0.1".to_string()]).unwrap();
    let key_pair = KeyPair::generate().unwrap();
    let cert = params.self_signed(&key_pair).unwrap();
    let identity = Identity::from_pkcs8(cert.pem().as_bytes(), key_pair.serialize_pem().as_bytes()).unwrap();
    let acceptor = TlsAcceptor::new(identity).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    std::thread::spawn(move || {
        for socket in listener.incoming().flatten() {
            let Ok(mut stream) = acceptor.accept(socket) else {
                continue;
            };
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let response = format!("HTTP/1.1 200 OK\r\n{headers}Content-Length: 0\r\nConnection: close\r\n\r\n");
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.shutdown();
        }
    });
    port
}

fn config_for(http_port: u16) -> ScannerConfig {
    ScannerConfig {
        http_port,
        https_port: closed_port(),
        http_timeout_secs: 5,
        ..ScannerConfig::default()
    }
}

/// Runs the headers scan against localhost and returns its results plus every progress line.
async fn scan(config: &ScannerConfig) -> (HeadersResults, Vec<String>) {
    let (sink, mut rx) = EventSink::channel();
    let log = sink.lease().await;
    let results = run_headers_scan("127.0.0.1", config, &log).await;
    drop(log);

    let mut lines = Vec::new();
    while let Ok(ScanEvent::Progress(line)) = rx.try_recv() {
        lines.push(line);
    }
    (results, lines)
}

#[tokio::test]
async fn test_audit_and_tech_labels_from_head_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Server", "nginx/1.25.3")
                .insert_header("X-Powered-By", "PHP/8.2.1")
                .insert_header("X-Content-Type-Options", "nosniff")
                .insert_header("X-Frame-Options", "SAMEORIGIN"),
        )
        .mount(&mock_server)
        .await;

    let (results, lines) = scan(&config_for(mock_server.address().port())).await;

    assert_eq!(results.tech_stack[..2], ["Server: nginx/1.25.3".to_string(), "Framework: PHP/8.2.1".to_string()]);
    assert!(lines.contains(&"ℹ DETECTED TECH: nginx/1.25.3".to_string()));

    let missing: Vec<_> = results
        .vulnerabilities
        .iter()
        .filter(|v| v.kind == "Missing Security Header")
        .collect();
    assert_eq!(missing.len(), 4);
    assert!(missing.iter().any(|v| v.description.starts_with("Missing Content-Security-Policy")));
    assert!(!missing.iter().any(|v| v.description.contains("X-Content-Type-Options")));

    let misconfigured: Vec<_> = results
        .vulnerabilities
        .iter()
        .filter(|v| v.kind == "Misconfigured Security Header")
        .collect();
    assert_eq!(misconfigured.len(), 1);
    assert_eq!(misconfigured[0].severity, Severity::Medium);
}

#[tokio::test]
async fn test_plain_http_redirect_is_not_followed() {
    let mock_server = MockServer::start().await;
    let elsewhere = format!("{}/elsewhere", mock_server.uri());

    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", elsewhere.as_str()))
        .mount(&mock_server)
        .await;

    Mock::given(method("HEAD"))
        .and(path("/elsewhere"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (results, lines) = scan(&config_for(mock_server.address().port())).await;

    assert!(lines.contains(&"HTTP Response: 301 Moved Permanently".to_string()));
    assert!(!lines.iter().any(|l| l.starts_with("Following redirect")));
    assert_eq!(results.vulnerabilities.len(), 6);
}

#[tokio::test]
async fn test_failed_https_redirect_falls_back_then_reports_connectivity() {
    let mock_server = MockServer::start().await;
    let dead_https = format!("https://127.0.0.1:{}/", closed_port());

    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", dead_https.as_str()))
        .mount(&mock_server)
        .await;

    let (results, lines) = scan(&config_for(mock_server.address().port())).await;

    assert!(lines.contains(&"Following redirect to HTTPS...".to_string()));
    assert!(lines.contains(&"HTTP connection failed. Trying direct HTTPS...".to_string()));
    assert_eq!(results.vulnerabilities.len(), 1);
    assert_eq!(results.vulnerabilities[0].kind, "Connectivity");
}

#[tokio::test]
async fn test_unreachable_host_yields_single_connectivity_finding() {
    let config = config_for(closed_port());
    let (results, lines) = scan(&config).await;

    assert!(results.tech_stack.is_empty());
    assert_eq!(results.vulnerabilities.len(), 1);

    let finding = &results.vulnerabilities[0];
    assert_eq!(finding.kind, "Connectivity");
    assert_eq!(finding.severity, Severity::Critical);
    assert!(finding.description.starts_with("Connection failed"));
    assert_eq!(finding.remediation, CONNECTIVITY_REMEDIATION);
    assert!(lines.iter().any(|l| l.starts_with("❌ Connection failed")));
}

#[tokio::test]
async fn test_https_redirect_is_followed_and_audited() {
    let mock_server = MockServer::start().await;
    let https_port = https_server("Server: nginx\r\nStrict-Transport-Security: max-age=31536000\r\n");
    let secure = format!("https://127.0.0.1:{https_port}/");

    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", secure.as_str()))
        .mount(&mock_server)
        .await;

    let config = ScannerConfig { accept_invalid_certs: true, ..config_for(mock_server.address().port()) };
    let (results, lines) = scan(&config).await;

    assert!(lines.contains(&"HTTP Response: 301 Moved Permanently".to_string()));
    assert!(lines.contains(&"Following redirect to HTTPS...".to_string()));
    assert!(!lines.iter().any(|l| l.starts_with("HTTP connection failed")));
    assert_eq!(results.tech_stack[0], "Server: nginx");
    assert_eq!(results.vulnerabilities.len(), 5);
    assert!(!results.vulnerabilities.iter().any(|v| v.description.contains("Strict-Transport-Security")));
}

#[tokio::test]
async fn test_direct_https_fallback_reads_headers() {
    let config = ScannerConfig {
        https_port: https_server("Server: Apache\r\nX-Frame-Options: DENY\r\n"),
        accept_invalid_certs: true,
        ..config_for(closed_port())
    };
    let (results, lines) = scan(&config).await;

    assert!(lines.contains(&"HTTP connection failed. Trying direct HTTPS...".to_string()));
    assert!(lines.contains(&"HTTPS Response: 200 OK".to_string()));
    assert_eq!(results.tech_stack[0], "Server: Apache");
    assert_eq!(results.vulnerabilities.len(), 5);
    assert!(results.vulnerabilities.iter().all(|v| v.kind == "Missing Security Header"));
}

#[tokio::test]
async fn test_self_signed_https_is_rejected_unless_allowed() {
    let config = ScannerConfig {
        https_port: https_server("Server: Apache\r\n"),
        ..config_for(closed_port())
    };
    let (results, lines) = scan(&config).await;

    assert!(!lines.iter().any(|l| l.starts_with("HTTPS Response")));
    assert_eq!(results.vulnerabilities.len(), 1);
    assert_eq!(results.vulnerabilities[0].kind, "Connectivity");
}
