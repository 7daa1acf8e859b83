//! Process-wide record of pickups this service has paid out.
//!
//! A pickup id is claimed before settlement starts and stays claimed once the
//! reward is paid, so a replayed or concurrent verify for the same code is
//! refused instead of paying twice. Entries live for the life of the process.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    InFlight,
    Settled { transaction_id: Option<String> },
    /// The claim was dropped mid-settlement; the payment may have gone out.
    Unresolved,
}

/// Why a pickup id could not be claimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimError {
    InFlight(String),
    Settled {
        pickup_id: String,
        transaction_id: Option<String>,
    },
    Unresolved(String),
}

impl fmt::Display for ClaimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimError::InFlight(id) => write!(f, "pickup {id} is already being settled"),
            ClaimError::Settled {
                pickup_id,
                transaction_id: Some(tx),
            } => write!(f, "pickup {pickup_id} was already settled in {tx}"),
            ClaimError::Settled { pickup_id, .. } => {
                write!(f, "pickup {pickup_id} was already settled")
            }
            ClaimError::Unresolved(id) => {
                write!(f, "pickup {id} has a settlement of unknown outcome")
            }
        }
    }
}

impl std::error::Error for ClaimError {}

#[derive(Default)]
pub struct PickupLedger {
    entries: Mutex<HashMap<String, Entry>>,
}

impl PickupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        // The map holds no invariant a panicking holder could break.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Reserve `pickup_id` for one settlement attempt.
    pub fn claim(self: &Arc<Self>, pickup_id: &str) -> Result<PickupClaim, ClaimError> {
        let mut entries = self.entries();
        match entries.get(pickup_id) {
            None => {
                entries.insert(pickup_id.to_string(), Entry::InFlight);
                Ok(PickupClaim {
                    ledger: Arc::clone(self),
                    pickup_id: pickup_id.to_string(),
                    resolved: false,
                })
            }
            Some(Entry::InFlight) => Err(ClaimError::InFlight(pickup_id.to_string())),
            Some(Entry::Settled { transaction_id }) => Err(ClaimError::Settled {
                pickup_id: pickup_id.to_string(),
                transaction_id: transaction_id.clone(),
            }),
            Some(Entry::Unresolved) => Err(ClaimError::Unresolved(pickup_id.to_string())),
        }
    }

    pub fn is_settled(&self, pickup_id: &str) -> bool {
        matches!(self.entries().get(pickup_id), Some(Entry::Settled { .. }))
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A held reservation. Resolve it with [`PickupClaim::settled`] or
/// [`PickupClaim::release`]; dropping it unresolved marks the pickup
/// unresolved and keeps it blocked.
pub struct PickupClaim {
    ledger: Arc<PickupLedger>,
    pickup_id: String,
    resolved: bool,
}

impl PickupClaim {
    pub fn pickup_id(&self) -> &str {
        &self.pickup_id
    }

    /// The reward was paid; the id stays claimed.
    pub fn settled(mut self, transaction_id: Option<String>) {
        self.resolved = true;
        self.ledger
            .entries()
            .insert(self.pickup_id.clone(), Entry::Settled { transaction_id });
    }

    /// Settlement failed without paying; the id may be verified again.
    pub fn release(mut self) {
        self.resolved = true;
        self.ledger.entries().remove(&self.pickup_id);
    }
}

impl Drop for PickupClaim {
    fn drop(&mut self) {
        if self.resolved {
            return;
        }
        warn!(
            pickup_id = %self.pickup_id,
            "Settlement abandoned before completing; pickup blocked until reconciled"
        );
        self.ledger
            .entries()
            .insert(self.pickup_id.clone(), Entry::Unresolved);
    }
}
