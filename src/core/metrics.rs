// src/core/metrics.rs

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;

/// How long a target counts as "recently scanned".
pub const DEFAULT_ACTIVITY_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Process-level scan counters, owned by whoever creates the scanner and injected into it.
#[derive(Debug)]
pub struct ScanMetrics {
    active_scans: AtomicU64,
    total_scans: AtomicU64,
    failed_scans: AtomicU64,
    recent_targets: Mutex<HashMap<String, Instant>>,
    window: Duration,
    started_at: Instant,
}

/// A point-in-time copy of the counters, suitable for display or serialization.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub active_scans: u64,
    pub total_scans: u64,
    pub failed_scans: u64,
    pub recent_targets: usize,
    pub uptime: String,
}

impl Default for ScanMetrics {
    fn default() -> Self {
        Self::with_window(DEFAULT_ACTIVITY_WINDOW)
    }
}

impl ScanMetrics {
    pub fn with_window(window: Duration) -> Self {
        Self {
            active_scans: AtomicU64::new(0),
            total_scans: AtomicU64::new(0),
            failed_scans: AtomicU64::new(0),
            recent_targets: Mutex::new(HashMap::new()),
            window,
            started_at: Instant::now(),
        }
    }

    /// Marks a scan as started. The scan stays active until the returned guard is dropped.
    pub fn begin_scan(self: &Arc<Self>, target: &str) -> ActiveScan {
        self.active_scans.fetch_add(1, Ordering::SeqCst);
        self.total_scans.fetch_add(1, Ordering::SeqCst);
        self.track_activity(target);
        ActiveScan { metrics: Arc::clone(self) }
    }

    pub fn record_failure(&self) {
        self.failed_scans.fetch_add(1, Ordering::SeqCst);
    }

    /// Records `key` as seen now. Entries older than the window are evicted on every call,
    /// so the map stays bounded even if nobody reads the counters.
    pub fn track_activity(&self, key: &str) {
        if key.is_empty() {
            return;
        }
        let mut recent = self.recent_targets.lock().unwrap_or_else(|e| e.into_inner());
        evict_expired(&mut recent, self.window);
        recent.insert(key.to_string(), Instant::now());
    }

    pub fn active_scans(&self) -> u64 {
        self.active_scans.load(Ordering::SeqCst)
    }

    pub fn total_scans(&self) -> u64 {
        self.total_scans.load(Ordering::SeqCst)
    }

    pub fn failed_scans(&self) -> u64 {
        self.failed_scans.load(Ordering::SeqCst)
    }

    /// Number of distinct targets seen within the activity window. Expired entries are evicted.
    pub fn recent_target_count(&self) -> usize {
        let mut recent = self.recent_targets.lock().unwrap_or_else(|e| e.into_inner());
        evict_expired(&mut recent, self.window);
        recent.len()
    }

    /// Uptime formatted as `"<hours>h <minutes>m"`.
    pub fn uptime(&self) -> String {
        format_uptime(self.started_at.elapsed())
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            active_scans: self.active_scans(),
            total_scans: self.total_scans(),
            failed_scans: self.failed_scans(),
            recent_targets: self.recent_target_count(),
            uptime: self.uptime(),
        }
    }
}

/// Guard for one running scan; decrements the active counter on drop.
#[derive(Debug)]
pub struct ActiveScan {
    metrics: Arc<ScanMetrics>,
}

impl Drop for ActiveScan {
    fn drop(&mut self) {
        self.metrics.active_scans.fetch_sub(1, Ordering::SeqCst);
    }
}

fn evict_expired(recent: &mut HashMap<String, Instant>, window: Duration) {
    recent.retain(|_, seen| seen.elapsed() <= window);
}

fn format_uptime(elapsed: Duration) -> String {
    let minutes = elapsed.as_secs() / 60;
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}
