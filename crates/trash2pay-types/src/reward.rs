//! Reward calculation for verified pickups.
//!
//! The same functions back the quote shown before confirmation and the
//! amounts paid out at settlement, so both always agree.

use serde::{Deserialize, Serialize};

use crate::WasteCategory;

/// Base reward for categories outside the table.
pub const DEFAULT_BASE_REWARD: u64 = 5;
/// Bonus tokens per reported kilogram.
pub const WEIGHT_BONUS_PER_KG: f64 = 0.5;
/// Ceiling on the weight bonus.
pub const MAX_WEIGHT_BONUS: f64 = 10.0;
/// Flat bonus when no positive weight was reported.
pub const NO_WEIGHT_BONUS: f64 = 1.0;
/// Fraction of the total paid to the requester.
pub const REQUESTER_SHARE: f64 = 0.7;
/// Fraction of the total paid to the collector.
pub const COLLECTOR_SHARE: f64 = 0.3;

/// Token amounts for one pickup.
///
/// Each share is rounded on its own, so `requester_share + collector_share`
/// may differ from `total_tokens` by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardQuote {
    pub total_tokens: u64,
    pub requester_share: u64,
    pub collector_share: u64,
}

impl RewardQuote {
    pub fn from_total(total_tokens: u64) -> Self {
        let total = total_tokens as f64;
        Self {
            total_tokens,
            requester_share: round_half_up(total * REQUESTER_SHARE),
            collector_share: round_half_up(total * COLLECTOR_SHARE),
        }
    }
}

/// Total reward in tokens for a category and optional weight in kilograms.
///
/// Never fails: unknown categories use [`DEFAULT_BASE_REWARD`], and a missing,
/// zero, negative or non-numeric weight earns [`NO_WEIGHT_BONUS`].
pub fn compute_reward(category: &WasteCategory, weight_kg: Option<f64>) -> u64 {
    let base = category.base_reward().unwrap_or(DEFAULT_BASE_REWARD) as f64;
    let bonus = match weight_kg {
        Some(w) if w > 0.0 => (w * WEIGHT_BONUS_PER_KG).min(MAX_WEIGHT_BONUS),
        _ => NO_WEIGHT_BONUS,
    };
    round_half_up(base + bonus)
}

/// Reward total plus the requester/collector split.
pub fn quote(category: &WasteCategory, weight_kg: Option<f64>) -> RewardQuote {
    RewardQuote::from_total(compute_reward(category, weight_kg))
}

/// Inputs here are never negative.
fn round_half_up(value: f64) -> u64 {
    (value + 0.5).floor() as u64
}
