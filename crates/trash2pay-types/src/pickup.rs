//! Pickup record as carried by a requester's pickup code.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{RewardQuote, WasteCategory};

/// One pickup attempt, as decoded from a scan.
///
/// Wire names follow the pickup code format: `pickupId`, `userId`,
/// `userName`, `wasteType`, `weight`, `userWallet`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WirePickup")]
pub struct PickupRecord {
    #[serde(rename = "pickupId")]
    pub pickup_id: String,
    #[serde(rename = "userId")]
    pub requester_id: String,
    #[serde(rename = "userName")]
    pub requester_name: String,
    #[serde(rename = "wasteType")]
    pub waste_category: WasteCategory,
    #[serde(rename = "weight", skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(rename = "userWallet", skip_serializing_if = "Option::is_none")]
    pub payout_destination: Option<String>,
}

impl PickupRecord {
    pub fn quote(&self) -> RewardQuote {
        crate::quote(&self.waste_category, self.weight_kg)
    }
}

/// Lenient decode shape. Every field may be missing or `null`, and scalar
/// ids are taken as text.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePickup {
    #[serde(default, deserialize_with = "lenient_text")]
    pickup_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    user_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    user_name: Option<String>,
    #[serde(default = "WasteCategory::unspecified", deserialize_with = "lenient_category")]
    waste_type: WasteCategory,
    #[serde(default, deserialize_with = "lenient_weight")]
    weight: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    user_wallet: Option<String>,
}

impl From<WirePickup> for PickupRecord {
    fn from(wire: WirePickup) -> Self {
        Self {
            pickup_id: wire.pickup_id.unwrap_or_else(generated_pickup_id),
            requester_id: wire.user_id.unwrap_or_default(),
            requester_name: wire.user_name.unwrap_or_default(),
            waste_category: wire.waste_type,
            weight_kg: wire.weight,
            payout_destination: wire.user_wallet.filter(|w| !w.is_empty()),
        }
    }
}

/// Strings as-is; numbers and booleans in their JSON text form. Arrays,
/// objects and `null` read as absent.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_category<'de, D: Deserializer<'de>>(deserializer: D) -> Result<WasteCategory, D::Error> {
    Ok(lenient_text(deserializer)?
        .map(|name| WasteCategory::from_name(&name))
        .unwrap_or_else(WasteCategory::unspecified))
}

/// Numbers and numeric strings become a weight; anything else is treated as
/// no weight reported.
fn lenient_weight<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|w| w.is_finite()))
}

/// `pickup-<unix millis>`.
pub(crate) fn generated_pickup_id() -> String {
    let ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    format!("pickup-{ms}")
}
