//! Global atomic counters for evaluation observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. when the CLI exits).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters.
pub struct Metrics {
    evaluations: AtomicU64,
    evaluations_failed: AtomicU64,
    indicators_run: AtomicU64,
    indicators_degraded: AtomicU64,
    indicators_timed_out: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            evaluations: AtomicU64::new(0),
            evaluations_failed: AtomicU64::new(0),
            indicators_run: AtomicU64::new(0),
            indicators_degraded: AtomicU64::new(0),
            indicators_timed_out: AtomicU64::new(0),
        }
    }

    pub fn inc_evaluations(&self) {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "evaluations", "counter incremented");
    }

    pub fn inc_evaluations_failed(&self) {
        self.evaluations_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "evaluations_failed", "counter incremented");
    }

    pub fn inc_indicators_run(&self) {
        self.indicators_run.fetch_add(1, Ordering::Relaxed);
    }

    /// Count an indicator that scored through the error or panic path.
    pub fn inc_indicators_degraded(&self) {
        self.indicators_degraded.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "indicators_degraded", "counter incremented");
    }

    pub fn inc_indicators_timed_out(&self) {
        self.indicators_timed_out.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "indicators_timed_out", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            evaluations = self.evaluations(),
            evaluations_failed = self.evaluations_failed(),
            indicators_run = self.indicators_run(),
            indicators_degraded = self.indicators_degraded(),
            indicators_timed_out = self.indicators_timed_out(),
        );
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations.load(Ordering::Relaxed)
    }

    pub fn evaluations_failed(&self) -> u64 {
        self.evaluations_failed.load(Ordering::Relaxed)
    }

    pub fn indicators_run(&self) -> u64 {
        self.indicators_run.load(Ordering::Relaxed)
    }

    pub fn indicators_degraded(&self) -> u64 {
        self.indicators_degraded.load(Ordering::Relaxed)
    }

    pub fn indicators_timed_out(&self) -> u64 {
        self.indicators_timed_out.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.evaluations.store(0, Ordering::Relaxed);
        self.evaluations_failed.store(0, Ordering::Relaxed);
        self.indicators_run.store(0, Ordering::Relaxed);
        self.indicators_degraded.store(0, Ordering::Relaxed);
        self.indicators_timed_out.store(0, Ordering::Relaxed);
    }
}
