//! Reward settlement: paying a quote out to the requester and collector.
//!
//! Backends implement [`Settlement`]; [`SettlementPolicy`] wraps any backend
//! with a per-attempt timeout and bounded retries.

mod handcash;
mod policy;
mod simulated;

pub use handcash::HandCashSettlement;
pub use policy::{SettlementFailure, SettlementPolicy};
pub use simulated::SimulatedSettlement;

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use trash2pay_types::{PickupRecord, RewardQuote};

/// What a backend is asked to pay.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementRequest {
    pub pickup_id: String,
    pub quote: RewardQuote,
    /// Requester wallet; the requester share is withheld when absent.
    pub requester_destination: Option<String>,
    pub collector_destination: String,
}

impl SettlementRequest {
    pub fn new(record: &PickupRecord, quote: RewardQuote, collector_destination: &str) -> Self {
        Self {
            pickup_id: record.pickup_id.clone(),
            quote,
            requester_destination: record.payout_destination.clone(),
            collector_destination: collector_destination.to_string(),
        }
    }
}

/// Backend confirmation of a distribution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settled {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementError {
    /// Refused by the ledger; retrying cannot help.
    Rejected(String),
    /// Network or upstream availability problem.
    Transport(String),
}

impl SettlementError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl std::fmt::Display for SettlementError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(msg) => write!(f, "settlement rejected: {msg}"),
            Self::Transport(msg) => write!(f, "settlement transport error: {msg}"),
        }
    }
}

impl std::error::Error for SettlementError {}

/// Distributes a reward quote.
pub trait Settlement: Send + Sync {
    fn settle(
        &self,
        request: &SettlementRequest,
    ) -> impl Future<Output = Result<Settled, SettlementError>> + Send;
}

impl<T: Settlement> Settlement for Arc<T> {
    fn settle(
        &self,
        request: &SettlementRequest,
    ) -> impl Future<Output = Result<Settled, SettlementError>> + Send {
        (**self).settle(request)
    }
}

/// Backend selected by configuration.
pub enum SettlementBackend {
    Simulated(SimulatedSettlement),
    HandCash(HandCashSettlement),
}

impl SettlementBackend {
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Simulated(_) => "simulated",
            Self::HandCash(_) => "handcash",
        }
    }

    /// Whether a settlement pays out real funds.
    pub fn moves_funds(&self) -> bool {
        matches!(self, Self::HandCash(_))
    }
}

impl Settlement for SettlementBackend {
    async fn settle(&self, request: &SettlementRequest) -> Result<Settled, SettlementError> {
        match self {
            Self::Simulated(backend) => backend.settle(request).await,
            Self::HandCash(backend) => backend.settle(request).await,
        }
    }
}

impl std::fmt::Debug for SettlementBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementBackend::{}", self.mode())
    }
}
