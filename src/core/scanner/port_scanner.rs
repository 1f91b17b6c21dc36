// src/core/scanner/port_scanner.rs

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::core::events::ScanLog;

/// Probes each candidate port on `address` with a bounded-time TCP connect.
///
/// At most `concurrency` probes are in flight at once, and never more than there are
/// candidates. All probes are joined before returning, and the result is sorted
/// ascending so it does not depend on completion order.
pub async fn run_port_scan(
    address: IpAddr,
    candidates: &[u16],
    probe_timeout: Duration,
    concurrency: usize,
    log: &ScanLog,
) -> Vec<u16> {
    let mut ports = candidates.to_vec();
    ports.sort_unstable();
    ports.dedup();

    if ports.is_empty() {
        return Vec::new();
    }

    let permits = concurrency.clamp(1, ports.len());
    info!(%address, candidates = ports.len(), permits, "Starting port scan.");
    let limiter = Arc::new(Semaphore::new(permits));

    let mut probes = JoinSet::new();
    for port in ports {
        let limiter = Arc::clone(&limiter);
        probes.spawn(async move {
            let _permit = limiter.acquire_owned().await.ok();
            (port, probe_port(SocketAddr::new(address, port), probe_timeout).await)
        });
    }

    let mut open_ports = Vec::new();
    while let Some(joined) = probes.join_next().await {
        match joined {
            Ok((port, true)) => open_ports.push(port),
            Ok((_, false)) => {}
            Err(e) => warn!(error = %e, "Port probe task failed."),
        }
    }
    open_ports.sort_unstable();

    for port in &open_ports {
        log.emit(format!("⚠ OPEN PORT: {port}"));
    }
    info!(open = open_ports.len(), "Port scan finished.");
    open_ports
}

/// Returns `true` if a TCP connection to `socket_addr` completes within `probe_timeout`.
pub async fn probe_port(socket_addr: SocketAddr, probe_timeout: Duration) -> bool {
    match timeout(probe_timeout, TcpStream::connect(socket_addr)).await {
        Ok(Ok(_)) => {
            debug!(%socket_addr, "Port open.");
            true
        }
        Ok(Err(e)) => {
            debug!(%socket_addr, error = %e, "Port closed.");
            false
        }
        Err(_elapsed) => {
            debug!(%socket_addr, "Port probe timed out.");
            false
        }
    }
}
