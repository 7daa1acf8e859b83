//! Prometheus metrics (lock-free atomics, zero allocation on hot path).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    // --- Scans ---
    pub scans_total: AtomicU64,
    pub scan_fallbacks: AtomicU64,
    pub scan_rejects: AtomicU64,
    pub acquisition_errors: AtomicU64,

    // --- Settlement ---
    pub settlements_ok: AtomicU64,
    pub settlements_failed: AtomicU64,
    pub settlement_timeouts: AtomicU64,
    pub settlement_retries: AtomicU64,
    pub tokens_distributed: AtomicU64,

    // --- Latency (μs, updated via CAS) ---
    pub settlement_duration_us_sum: AtomicU64,
    pub settlement_duration_us_max: AtomicU64,

    // --- Wallet API ---
    pub registrations: AtomicU64,
    pub wallet_errors: AtomicU64,
}

impl Metrics {
    const fn new() -> Self {
        Self {
            scans_total: AtomicU64::new(0),
            scan_fallbacks: AtomicU64::new(0),
            scan_rejects: AtomicU64::new(0),
            acquisition_errors: AtomicU64::new(0),
            settlements_ok: AtomicU64::new(0),
            settlements_failed: AtomicU64::new(0),
            settlement_timeouts: AtomicU64::new(0),
            settlement_retries: AtomicU64::new(0),
            tokens_distributed: AtomicU64::new(0),
            settlement_duration_us_sum: AtomicU64::new(0),
            settlement_duration_us_max: AtomicU64::new(0),
            registrations: AtomicU64::new(0),
            wallet_errors: AtomicU64::new(0),
        }
    }

    pub fn record_settlement_duration(&self, start: Instant) {
        let us = start.elapsed().as_micros() as u64;
        self.settlement_duration_us_sum
            .fetch_add(us, Ordering::Relaxed);
        // CAS loop for max tracking
        let mut cur = self.settlement_duration_us_max.load(Ordering::Relaxed);
        while us > cur {
            match self.settlement_duration_us_max.compare_exchange_weak(
                cur,
                us,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => cur = actual,
            }
        }
    }

    /// Render in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let scans = self.scans_total.load(Ordering::Relaxed);
        let fallbacks = self.scan_fallbacks.load(Ordering::Relaxed);
        let rejects = self.scan_rejects.load(Ordering::Relaxed);
        let acquisition = self.acquisition_errors.load(Ordering::Relaxed);
        let ok = self.settlements_ok.load(Ordering::Relaxed);
        let failed = self.settlements_failed.load(Ordering::Relaxed);
        let timeouts = self.settlement_timeouts.load(Ordering::Relaxed);
        let retries = self.settlement_retries.load(Ordering::Relaxed);
        let tokens = self.tokens_distributed.load(Ordering::Relaxed);
        let dur_sum = self.settlement_duration_us_sum.load(Ordering::Relaxed);
        let dur_max = self.settlement_duration_us_max.swap(0, Ordering::Relaxed);
        let registrations = self.registrations.load(Ordering::Relaxed);
        let wallet_errors = self.wallet_errors.load(Ordering::Relaxed);

        // Convert μs to seconds for Prometheus conventions
        let dur_sum_s = dur_sum as f64 / 1_000_000.0;
        let dur_max_s = dur_max as f64 / 1_000_000.0;

        format!(
            "\
# HELP trash2pay_scans_total Pickup codes interpreted.\n\
# TYPE trash2pay_scans_total counter\n\
trash2pay_scans_total {scans}\n\
# HELP trash2pay_scan_fallbacks_total Unreadable codes replaced by the demo record.\n\
# TYPE trash2pay_scan_fallbacks_total counter\n\
trash2pay_scan_fallbacks_total {fallbacks}\n\
# HELP trash2pay_scan_rejects_total Unreadable codes rejected in strict mode.\n\
# TYPE trash2pay_scan_rejects_total counter\n\
trash2pay_scan_rejects_total {rejects}\n\
# HELP trash2pay_acquisition_errors_total Scan channels that failed to start or ended early.\n\
# TYPE trash2pay_acquisition_errors_total counter\n\
trash2pay_acquisition_errors_total {acquisition}\n\
# HELP trash2pay_settlements_total Confirmed reward distributions.\n\
# TYPE trash2pay_settlements_total counter\n\
trash2pay_settlements_total {ok}\n\
# HELP trash2pay_settlement_errors_total Settlements that failed after retries.\n\
# TYPE trash2pay_settlement_errors_total counter\n\
trash2pay_settlement_errors_total {failed}\n\
# HELP trash2pay_settlement_timeouts_total Settlements abandoned on timeout.\n\
# TYPE trash2pay_settlement_timeouts_total counter\n\
trash2pay_settlement_timeouts_total {timeouts}\n\
# HELP trash2pay_settlement_retries_total Settlement retry attempts.\n\
# TYPE trash2pay_settlement_retries_total counter\n\
trash2pay_settlement_retries_total {retries}\n\
# HELP trash2pay_tokens_distributed_total T2C tokens quoted on confirmed settlements.\n\
# TYPE trash2pay_tokens_distributed_total counter\n\
trash2pay_tokens_distributed_total {tokens}\n\
# HELP trash2pay_settlement_duration_seconds_sum Total settlement time (seconds).\n\
# TYPE trash2pay_settlement_duration_seconds_sum counter\n\
trash2pay_settlement_duration_seconds_sum {dur_sum_s:.6}\n\
# HELP trash2pay_settlement_duration_seconds_max Max settlement time since last scrape (seconds).\n\
# TYPE trash2pay_settlement_duration_seconds_max gauge\n\
trash2pay_settlement_duration_seconds_max {dur_max_s:.6}\n\
# HELP trash2pay_registrations_total Registration fees charged.\n\
# TYPE trash2pay_registrations_total counter\n\
trash2pay_registrations_total {registrations}\n\
# HELP trash2pay_wallet_errors_total HandCash API errors.\n\
# TYPE trash2pay_wallet_errors_total counter\n\
trash2pay_wallet_errors_total {wallet_errors}\n"
        )
    }
}
