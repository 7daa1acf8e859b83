//! Timeout and retry around a settlement backend.

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::{Settled, Settlement, SettlementError, SettlementRequest};
use crate::metrics::METRICS;

/// Per-attempt timeout plus bounded retries with exponential backoff.
///
/// Only transport failures and timeouts are retried. A timed-out attempt
/// may still have been applied upstream, so backends should tag payments
/// with the pickup id for reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for SettlementPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_retries: 2,
            base_delay: Duration::from_millis(200),
        }
    }
}

/// Final outcome of a failed settlement run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementFailure {
    /// The last attempt hit the deadline.
    TimedOut { attempts: u32 },
    /// The backend reported an error on the last attempt.
    Failed {
        attempts: u32,
        error: SettlementError,
    },
}

impl SettlementPolicy {
    /// Retry delay for retry n (0-indexed).
    pub fn retry_delay(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(retry))
    }

    /// Run `backend` until it succeeds, is rejected, or retries run out.
    /// Returns the confirmation and the number of attempts made.
    pub async fn run<S: Settlement>(
        &self,
        backend: &S,
        request: &SettlementRequest,
    ) -> Result<(Settled, u32), SettlementFailure> {
        let start = Instant::now();
        let mut last = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.retry_delay(attempt - 1);
                METRICS.settlement_retries.fetch_add(1, Ordering::Relaxed);
                warn!(
                    pickup_id = %request.pickup_id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying settlement"
                );
                tokio::time::sleep(delay).await;
            }

            let attempts = attempt + 1;
            match tokio::time::timeout(self.timeout, backend.settle(request)).await {
                Ok(Ok(settled)) => {
                    METRICS.record_settlement_duration(start);
                    info!(
                        pickup_id = %request.pickup_id,
                        attempts,
                        tx = settled.transaction_id.as_deref().unwrap_or("-"),
                        "Settlement confirmed"
                    );
                    return Ok((settled, attempts));
                }
                Ok(Err(error)) if !error.is_retryable() => {
                    METRICS.record_settlement_duration(start);
                    return Err(SettlementFailure::Failed { attempts, error });
                }
                Ok(Err(error)) => {
                    warn!(pickup_id = %request.pickup_id, attempts, error = %error, "Settlement attempt failed");
                    last = Some(SettlementFailure::Failed { attempts, error });
                }
                Err(_) => {
                    warn!(
                        pickup_id = %request.pickup_id,
                        attempts,
                        timeout_ms = self.timeout.as_millis() as u64,
                        "Settlement attempt timed out"
                    );
                    last = Some(SettlementFailure::TimedOut { attempts });
                }
            }
        }

        METRICS.record_settlement_duration(start);
        Err(last.unwrap_or(SettlementFailure::TimedOut { attempts: 0 }))
    }
}
