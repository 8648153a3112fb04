use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tracing::info;

/// Counters for one playback session.
///
/// Updated by the scheduler task, readable from the session handle at any time.
#[derive(Debug, Default)]
pub struct SessionMetrics {
    /// Playable segments pushed to the queue
    pub segments_total: AtomicU64,
    /// Header segments fetched on track switches (including the first segment)
    pub header_segments_total: AtomicU64,
    /// Payload bytes downloaded, headers included
    pub bytes_total: AtomicU64,
    /// Sum of download times in milliseconds
    pub download_time_sum_ms: AtomicU64,
    pub track_switches: AtomicU64,
    /// Selections lowered by the queue headroom guard
    pub headroom_downshifts: AtomicU64,
    pub fetch_errors: AtomicU64,
    /// Most recent bandwidth sample in bits per second
    pub last_bandwidth_bps: AtomicU64,
    pub current_track: AtomicU64,
}

/// Point-in-time copy of [`SessionMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub segments_total: u64,
    pub header_segments_total: u64,
    pub bytes_total: u64,
    pub download_time_sum_ms: u64,
    pub track_switches: u64,
    pub headroom_downshifts: u64,
    pub fetch_errors: u64,
    pub last_bandwidth_bps: u64,
    pub current_track: u64,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished download. Header segments count separately from playable ones.
    pub fn record_download(&self, bytes: u64, elapsed: Duration, header: bool) {
        if header {
            self.header_segments_total.fetch_add(1, Ordering::Relaxed);
        } else {
            self.segments_total.fetch_add(1, Ordering::Relaxed);
        }
        self.bytes_total.fetch_add(bytes, Ordering::Relaxed);
        self.download_time_sum_ms.fetch_add(
            u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            Ordering::Relaxed,
        );
    }

    pub fn record_bandwidth(&self, bits_per_second: u64) {
        self.last_bandwidth_bps
            .store(bits_per_second, Ordering::Relaxed);
    }

    pub fn record_track(&self, track: usize, switched: bool) {
        if switched {
            self.track_switches.fetch_add(1, Ordering::Relaxed);
        }
        self.current_track.store(track as u64, Ordering::Relaxed);
    }

    pub fn record_headroom_downshift(&self) {
        self.headroom_downshifts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_error(&self) {
        self.fetch_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Mean throughput over all downloads in bytes per second
    pub fn average_throughput(&self) -> Option<f64> {
        let bytes = self.bytes_total.load(Ordering::Relaxed);
        let time_ms = self.download_time_sum_ms.load(Ordering::Relaxed);
        if time_ms == 0 {
            return None;
        }
        Some(bytes as f64 * 1000.0 / time_ms as f64)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            segments_total: self.segments_total.load(Ordering::Relaxed),
            header_segments_total: self.header_segments_total.load(Ordering::Relaxed),
            bytes_total: self.bytes_total.load(Ordering::Relaxed),
            download_time_sum_ms: self.download_time_sum_ms.load(Ordering::Relaxed),
            track_switches: self.track_switches.load(Ordering::Relaxed),
            headroom_downshifts: self.headroom_downshifts.load(Ordering::Relaxed),
            fetch_errors: self.fetch_errors.load(Ordering::Relaxed),
            last_bandwidth_bps: self.last_bandwidth_bps.load(Ordering::Relaxed),
            current_track: self.current_track.load(Ordering::Relaxed),
        }
    }

    pub fn log_summary(&self) {
        let snapshot = self.snapshot();
        info!(
            segments = snapshot.segments_total,
            header_segments = snapshot.header_segments_total,
            bytes = snapshot.bytes_total,
            track_switches = snapshot.track_switches,
            headroom_downshifts = snapshot.headroom_downshifts,
            fetch_errors = snapshot.fetch_errors,
            last_bandwidth_bps = snapshot.last_bandwidth_bps,
            avg_throughput = self
                .average_throughput()
                .map(|t| format!("{:.0} B/s", t))
                .unwrap_or_else(|| "n/a".to_string()),
            "Session metrics"
        );
    }
}
