//! Shared types and pure-logic utilities for Trash2Cash pickup verification.
//! No async and no I/O, so the verifier service and any other consumer can share it.

mod category;
mod error;
mod pickup;
mod reward;
mod scan;

pub use category::WasteCategory;
pub use error::DecodeError;
pub use pickup::PickupRecord;
pub use reward::{
    compute_reward, quote, RewardQuote, COLLECTOR_SHARE, DEFAULT_BASE_REWARD, MAX_WEIGHT_BONUS,
    NO_WEIGHT_BONUS, REQUESTER_SHARE, WEIGHT_BONUS_PER_KG,
};
pub use scan::{
    interpret, interpret_scan, interpret_strict, placeholder_record, FallbackReason, ScanOutcome,
    DEMO_PAYLOAD,
};
