//! Settlement that moves no funds, for demos and local development.

use rand::Rng;
use std::time::Duration;
use tracing::info;

use super::{Settled, Settlement, SettlementError, SettlementRequest};

/// Waits `delay`, then reports the distribution as done.
#[derive(Debug, Clone)]
pub struct SimulatedSettlement {
    delay: Duration,
}

impl SimulatedSettlement {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Settlement for SimulatedSettlement {
    async fn settle(&self, request: &SettlementRequest) -> Result<Settled, SettlementError> {
        tokio::time::sleep(self.delay).await;
        let tx = format!("sim-{:016x}", rand::thread_rng().gen::<u64>());
        info!(
            pickup_id = %request.pickup_id,
            total = request.quote.total_tokens,
            requester = request.quote.requester_share,
            collector = request.quote.collector_share,
            tx = %tx,
            "Simulated reward distribution"
        );
        Ok(Settled {
            transaction_id: Some(tx),
            explorer_url: None,
        })
    }
}
