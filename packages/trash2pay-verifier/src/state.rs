//! Application state shared across handlers.

use crate::config::{Config, SettlementMode};
use crate::ledger::PickupLedger;
use crate::settlement::{HandCashSettlement, SettlementBackend, SimulatedSettlement};
use crate::wallet::HandCashClient;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub wallet: Arc<HandCashClient>,
    pub settlement: Arc<SettlementBackend>,
    /// Pickups claimed or paid by `/pickups/verify`.
    pub pickups: Arc<PickupLedger>,
    pub start_time: Instant,
    pub request_count: AtomicU64,
}

impl AppState {
    /// Create application state from configuration.
    pub fn new(config: Config) -> Result<Self, crate::Error> {
        let wallet = Arc::new(HandCashClient::new(&config.wallet)?);

        let settlement = match config.settlement.mode {
            SettlementMode::Simulated => SettlementBackend::Simulated(SimulatedSettlement::new(
                Duration::from_millis(config.settlement.simulated_delay_ms),
            )),
            SettlementMode::Handcash => {
                let token = config.settlement.auth_token.clone().ok_or_else(|| {
                    crate::Error::Config(
                        "settlement.mode = handcash requires a platform auth token".into(),
                    )
                })?;
                SettlementBackend::HandCash(HandCashSettlement::new(
                    Arc::clone(&wallet),
                    token,
                    config.wallet.reward_currency_code.clone(),
                ))
            }
        };

        if settlement.moves_funds() && !config.scan.strict_decoding {
            warn!("scan.strict_decoding forced on: unreadable codes are never paid out");
        }

        info!(
            settlement = settlement.mode(),
            wallet_configured = wallet.is_configured(),
            "Verifier state ready"
        );

        Ok(Self {
            config,
            wallet,
            settlement: Arc::new(settlement),
            pickups: Arc::new(PickupLedger::new()),
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
        })
    }

    /// Strict decoding as configured, always on when settlement pays real
    /// funds so a placeholder record is never paid.
    pub fn strict_decoding(&self) -> bool {
        self.config.scan.strict_decoding || self.settlement.moves_funds()
    }
}
