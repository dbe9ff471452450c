//! Atomic counters for observability. Purely informational: nothing here
//! gates server behavior, and nothing here is part of the wire protocol.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::SystemTime;

use log::info;

pub struct Metrics {
    pub connections_total: AtomicU64,
    pub connections_active: AtomicUsize,
    pub records_appended_total: AtomicU64,
    pub records_overwritten_total: AtomicU64,
    pub bytes_echoed_total: AtomicU64,
    pub seek_ok_total: AtomicU64,
    pub seek_malformed_total: AtomicU64,
    pub timestamps_emitted_total: AtomicU64,
    ring_bytes: AtomicUsize,
    start_time: SystemTime,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            connections_total: AtomicU64::new(0),
            connections_active: AtomicUsize::new(0),
            records_appended_total: AtomicU64::new(0),
            records_overwritten_total: AtomicU64::new(0),
            bytes_echoed_total: AtomicU64::new(0),
            seek_ok_total: AtomicU64::new(0),
            seek_malformed_total: AtomicU64::new(0),
            timestamps_emitted_total: AtomicU64::new(0),
            ring_bytes: AtomicUsize::new(0),
            start_time: SystemTime::now(),
        }
    }

    pub fn set_ring_bytes(&self, bytes: usize) {
        self.ring_bytes.store(bytes, Ordering::Relaxed);
    }

    pub fn log_summary(&self) {
        let uptime = self
            .start_time
            .elapsed()
            .map(|d| d.as_secs())
            .unwrap_or(0);
        info!(
            "uptime={}s connections_total={} records_appended={} records_overwritten={} \
             bytes_echoed={} seek_ok={} seek_malformed={} timestamps_emitted={} ring_bytes={}",
            uptime,
            self.connections_total.load(Ordering::Relaxed),
            self.records_appended_total.load(Ordering::Relaxed),
            self.records_overwritten_total.load(Ordering::Relaxed),
            self.bytes_echoed_total.load(Ordering::Relaxed),
            self.seek_ok_total.load(Ordering::Relaxed),
            self.seek_malformed_total.load(Ordering::Relaxed),
            self.timestamps_emitted_total.load(Ordering::Relaxed),
            self.ring_bytes.load(Ordering::Relaxed),
        );
    }
}
