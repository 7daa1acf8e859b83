//! Response types for the verifier API.

use serde::Serialize;

use crate::workflow::SettlementReceipt;

/// Response from the health endpoint.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub settlement_mode: &'static str,
    pub wallet_configured: bool,
    pub uptime_secs: u64,
    pub requests: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectUrlResponse {
    pub redirect_url: String,
}

/// Public profile of a verified wallet token.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub handle: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub paymail: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,
    pub transaction_id: String,
    pub whatsonchain_url: String,
    pub message: String,
}

/// Settled pickup, plus the fallback reason when the posted code was
/// unreadable and the demo record was paid instead.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub success: bool,
    #[serde(flatten)]
    pub receipt: SettlementReceipt,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}
