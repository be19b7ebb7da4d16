use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::lenient_fallback_count;

/// Counters for the monitor, shared across runs
#[derive(Debug, Default)]
pub struct MonitorMetrics {
    pub runs: AtomicU64,
    pub symbols_checked: AtomicU64,
    pub symbols_failed: AtomicU64,
    pub signals_detected: AtomicU64,
    pub signals_suppressed: AtomicU64,
    pub notifications_sent: AtomicU64,
    pub notifications_failed: AtomicU64,
    pub enrichments_failed: AtomicU64,
    pub suppression_errors: AtomicU64,
}

impl MonitorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "runs={} symbols={} failed={} signals={} suppressed={} sent={} send_failed={} \
             enrich_failed={} store_errors={} lenient_parses={}",
            Self::get(&self.runs),
            Self::get(&self.symbols_checked),
            Self::get(&self.symbols_failed),
            Self::get(&self.signals_detected),
            Self::get(&self.signals_suppressed),
            Self::get(&self.notifications_sent),
            Self::get(&self.notifications_failed),
            Self::get(&self.enrichments_failed),
            Self::get(&self.suppression_errors),
            lenient_fallback_count(),
        )
    }
}
