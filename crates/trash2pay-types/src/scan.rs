//! Interpretation of raw scan payloads.
//!
//! A payload that does not decode is replaced by a placeholder demo record so
//! an operator is never blocked by a bad code. [`ScanOutcome`] keeps the two
//! paths apart, so callers that must not accept substituted data can refuse
//! the fallback (or use [`interpret_strict`]).

use crate::pickup::generated_pickup_id;
use crate::{DecodeError, PickupRecord, WasteCategory};

/// The demo scan offered next to the camera view.
pub const DEMO_PAYLOAD: &str = r#"{"pickupId":"demo-pickup-001","userId":"demo-user","userName":"Sarah Wilson","wasteType":"Recyclables","weight":3.2}"#;

/// Why a payload was replaced by the placeholder record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackReason(pub String);

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of interpreting one payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Decoded(PickupRecord),
    Fallback {
        record: PickupRecord,
        reason: FallbackReason,
    },
}

impl ScanOutcome {
    pub fn record(&self) -> &PickupRecord {
        match self {
            Self::Decoded(record) | Self::Fallback { record, .. } => record,
        }
    }

    pub fn into_record(self) -> PickupRecord {
        match self {
            Self::Decoded(record) | Self::Fallback { record, .. } => record,
        }
    }

    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        match self {
            Self::Decoded(_) => None,
            Self::Fallback { reason, .. } => Some(reason),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Decode a payload, substituting the placeholder record on failure.
pub fn interpret_scan(raw: &str) -> ScanOutcome {
    match interpret_strict(raw) {
        Ok(record) => ScanOutcome::Decoded(record),
        Err(DecodeError(reason)) => ScanOutcome::Fallback {
            record: placeholder_record(),
            reason: FallbackReason(reason),
        },
    }
}

/// Decode a payload into a record. Never fails.
pub fn interpret(raw: &str) -> PickupRecord {
    interpret_scan(raw).into_record()
}

/// Decode a payload, reporting malformed input instead of substituting.
pub fn interpret_strict(raw: &str) -> Result<PickupRecord, DecodeError> {
    serde_json::from_str(raw).map_err(|e| DecodeError(e.to_string()))
}

/// Canned demo identity used when a scan cannot be decoded.
pub fn placeholder_record() -> PickupRecord {
    PickupRecord {
        pickup_id: generated_pickup_id(),
        requester_id: "user-123".into(),
        requester_name: "Demo User".into(),
        waste_category: WasteCategory::Recyclables,
        weight_kg: Some(2.5),
        payout_destination: None,
    }
}
