//! # Link Statistics
//!
//! Per-socket counters updated by both pipelines. Atomics, because the reader
//! and writer tasks share one instance; [`LinkStats::snapshot`] produces a
//! plain serializable view for export.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Shared per-socket counters.
#[derive(Debug, Default)]
pub struct LinkStats {
    frames_sent: AtomicU64,
    frames_received: AtomicU64,
    retransmits: AtomicU64,
    acks_received: AtomicU64,
    decode_failures: AtomicU64,
    coalesced: AtomicU64,
    dropped_after_retries: AtomicU64,
    queue_rejections: AtomicU64,
    write_failures: AtomicU64,
}

impl LinkStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retransmit(&self) {
        self.retransmits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ack_received(&self) {
        self.acks_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_after_retries(&self) {
        self.dropped_after_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_queue_rejection(&self) {
        self.queue_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// A consistent-enough copy of every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            retransmits: self.retransmits.load(Ordering::Relaxed),
            acks_received: self.acks_received.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            dropped_after_retries: self.dropped_after_retries.load(Ordering::Relaxed),
            queue_rejections: self.queue_rejections.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of a socket's counters.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Frames handed to the driver (first transmissions only).
    pub frames_sent: u64,
    /// Frames successfully decoded off the wire.
    pub frames_received: u64,
    /// Pending-list retransmissions.
    pub retransmits: u64,
    /// Inbound acknowledgements.
    pub acks_received: u64,
    /// Frames dropped for checksum mismatch or malformed payload.
    pub decode_failures: u64,
    /// Updates merged into a queued entry instead of appended.
    pub coalesced: u64,
    /// Packets abandoned after exhausting the retry budget.
    pub dropped_after_retries: u64,
    /// Enqueue attempts rejected by a full queue.
    pub queue_rejections: u64,
    /// Driver write calls that reported failure.
    pub write_failures: u64,
}

impl StatsSnapshot {
    /// Fraction of first transmissions that needed at least one retry.
    pub fn retransmit_ratio(&self) -> f64 {
        if self.frames_sent == 0 {
            0.0
        } else {
            self.retransmits as f64 / self.frames_sent as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let stats = LinkStats::new();
        stats.record_frame_sent();
        stats.record_frame_sent();
        stats.record_retransmit();
        stats.record_decode_failure();

        let snap = stats.snapshot();
        assert_eq!(snap.frames_sent, 2);
        assert_eq!(snap.retransmits, 1);
        assert_eq!(snap.decode_failures, 1);
        assert_eq!(snap.frames_received, 0);
    }

    #[test]
    fn retransmit_ratio() {
        let stats = LinkStats::new();
        for _ in 0..4 {
            stats.record_frame_sent();
        }
        stats.record_retransmit();
        assert!((stats.snapshot().retransmit_ratio() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn retransmit_ratio_zero_when_nothing_sent() {
        assert_eq!(LinkStats::new().snapshot().retransmit_ratio(), 0.0);
    }

    #[test]
    fn snapshot_serializes() {
        let json = serde_json::to_string(&LinkStats::new().snapshot()).unwrap();
        assert!(json.contains("\"frames_sent\":0"));
    }
}
