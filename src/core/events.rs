// src/core/events.rs

use std::sync::Arc;

use strum::Display;
use tokio::sync::{mpsc, Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::core::models::ScanReport;

/// One message on a scan's event stream.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// A human-readable progress line. Consumers must treat these as log lines.
    Progress(String),
    /// The final report. Sent exactly once per scan, always last.
    Done(Box<ScanReport>),
}

/// Stage tags that mark phase boundaries in the progress stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Stage {
    #[strum(to_string = "[STAGE:NETWORK]")]
    Network,
    #[strum(to_string = "[STAGE:APP]")]
    App,
    #[strum(to_string = "[STAGE:SECURITY]")]
    Security,
}

/// The producing half of an event stream.
///
/// A sink may be cloned and shared between several scans. Each scan takes an
/// exclusive [`ScanLog`] lease before writing its first line and keeps it until its
/// `Done` event is sent, so lines from different scans never interleave.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<ScanEvent>,
    lease: Arc<Mutex<()>>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<ScanEvent>) -> Self {
        Self { tx, lease: Arc::new(Mutex::new(())) }
    }

    /// Creates a sink together with the receiver that consumes it.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ScanEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Waits until no other scan is writing to this sink, then takes the lease.
    pub async fn lease(&self) -> ScanLog {
        let guard = self.lease.clone().lock_owned().await;
        ScanLog { tx: self.tx.clone(), _lease: Arc::new(guard) }
    }

    /// Delivers a report for a scan that never took the lease.
    ///
    /// The stream only gains the single `Done` event, so no progress lines from this
    /// scan can land inside another scan's segment.
    pub fn finish_unleased(&self, report: ScanReport) {
        let _ = self.tx.send(ScanEvent::Done(Box::new(report)));
    }

    /// Resolves once the consumer has dropped its receiver.
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}

/// A scan's exclusive writing handle on an [`EventSink`].
///
/// Clones share the same lease; the sink is released once every clone is dropped.
#[derive(Debug, Clone)]
pub struct ScanLog {
    tx: mpsc::UnboundedSender<ScanEvent>,
    _lease: Arc<OwnedMutexGuard<()>>,
}

impl ScanLog {
    /// Appends a progress line. A disconnected consumer is not an error.
    pub fn emit(&self, line: impl Into<String>) {
        let line = line.into();
        debug!(event = %line, "Scan progress.");
        let _ = self.tx.send(ScanEvent::Progress(line));
    }

    /// Appends a progress line prefixed with a stage tag.
    pub fn stage(&self, stage: Stage, message: &str) {
        self.emit(format!("{stage} {message}"));
    }

    /// Delivers the final report. Consumes the handle so it cannot be called twice.
    pub fn finish(self, report: ScanReport) {
        let _ = self.tx.send(ScanEvent::Done(Box::new(report)));
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
