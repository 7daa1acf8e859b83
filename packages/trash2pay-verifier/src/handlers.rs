//! HTTP request handlers.

use crate::channel::PayloadChannel;
use crate::error::Error;
use crate::metrics::METRICS;
use crate::middleware::RequestId;
use crate::response::{
    HealthResponse, ProfileResponse, RedirectUrlResponse, RegisterResponse, VerifyResponse,
};
use crate::session::{UserRole, WalletSession};
use crate::state::AppState;
use crate::wallet::{PaymentReceiver, PaymentRequest};
use crate::workflow::{ScanOptions, Workflow};
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::Deserialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};
use trash2pay_types::{quote, RewardQuote, WasteCategory};

/// Health check with basic counters.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        settlement_mode: state.settlement.mode(),
        wallet_configured: state.wallet.is_configured(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        requests: state.request_count.load(Ordering::Relaxed),
    })
}

/// Prometheus text exposition.
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        METRICS.render(),
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandCashAuthRequest {
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    auth_token: Option<String>,
}

/// `get-redirect-url` issues the OAuth link; `verify-token` resolves a
/// token to its public profile.
pub async fn handcash_auth(
    State(state): State<Arc<AppState>>,
    Json(request): Json<HandCashAuthRequest>,
) -> Result<axum::response::Response, Error> {
    state.request_count.fetch_add(1, Ordering::Relaxed);

    match (request.action.as_deref(), request.auth_token.as_deref()) {
        (Some("get-redirect-url"), _) => {
            let redirect_url = state.wallet.redirect_url()?;
            info!("Issued HandCash redirect URL");
            Ok(Json(RedirectUrlResponse { redirect_url }).into_response())
        }
        (Some("verify-token"), Some(token)) if !token.is_empty() => {
            let profile = state.wallet.current_user_profile(token).await?;
            info!(handle = profile.handle.as_deref().unwrap_or("-"), "Token verified");
            Ok(Json(ProfileResponse {
                handle: profile.handle,
                display_name: profile.display_name,
                avatar_url: profile.avatar_url,
                paymail: profile.paymail,
            })
            .into_response())
        }
        (action, _) => {
            warn!(action = action.unwrap_or("-"), "Rejected wallet auth request");
            Err(Error::BadRequest("Invalid action".into()))
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    auth_token: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    wallet_handle: Option<String>,
}

/// Charge the registration fee from the caller's wallet to the platform
/// wallet.
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, Error> {
    state.request_count.fetch_add(1, Ordering::Relaxed);

    let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
    let (Some(auth_token), Some(role), Some(wallet_handle)) = (
        non_empty(request.auth_token),
        non_empty(request.role),
        non_empty(request.wallet_handle),
    ) else {
        return Err(Error::BadRequest(
            "Missing required fields: authToken, role, walletHandle".into(),
        ));
    };
    let role: UserRole = role
        .parse()
        .map_err(|_| Error::BadRequest(format!("Invalid role: {role}")))?;

    let wallet = &state.config.wallet;
    info!(
        request_id = %request_id.0,
        wallet = %wallet_handle,
        role = role.as_str(),
        fee = wallet.registration_fee_satoshis,
        "Processing registration"
    );

    let payment = PaymentRequest {
        description: format!("Trash2Pay Registration Fee - {}", role.label()),
        receivers: vec![PaymentReceiver {
            destination: wallet.platform_wallet.clone(),
            currency_code: "SAT".into(),
            send_amount: wallet.registration_fee_satoshis,
        }],
        app_action: "registration".into(),
    };
    let result = state.wallet.pay(&auth_token, &payment).await?;
    METRICS.registrations.fetch_add(1, Ordering::Relaxed);

    let whatsonchain_url = state.wallet.explorer_url(&result.transaction_id);
    info!(tx = %result.transaction_id, wallet = %wallet_handle, "Registration complete");

    Ok(Json(RegisterResponse {
        success: true,
        transaction_id: result.transaction_id,
        whatsonchain_url,
        message: format!(
            "Successfully registered as {}. Transaction recorded on BSV blockchain.",
            role.as_str()
        ),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    #[serde(default)]
    waste_type: Option<WasteCategory>,
    #[serde(default)]
    weight: Option<f64>,
}

/// Reward preview; the same arithmetic settlement uses.
pub async fn quote_reward(Json(request): Json<QuoteRequest>) -> Json<RewardQuote> {
    let category = request.waste_type.unwrap_or_else(WasteCategory::unspecified);
    Json(quote(&category, request.weight))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    #[serde(default)]
    payload: Option<String>,
    #[serde(default)]
    collector_handle: Option<String>,
}

/// Run one pickup through the confirmation workflow: interpret the posted
/// code, quote it and settle the reward to requester and collector.
pub async fn verify_pickup(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, Error> {
    state.request_count.fetch_add(1, Ordering::Relaxed);

    let (Some(payload), Some(collector)) = (
        request.payload,
        request.collector_handle.filter(|h| !h.is_empty()),
    ) else {
        return Err(Error::BadRequest(
            "Missing required fields: payload, collectorHandle".into(),
        ));
    };

    info!(request_id = %request_id.0, collector = %collector, "Verifying pickup");

    let scan = &state.config.scan;
    let mut workflow = Workflow::new(
        WalletSession::handcash(collector),
        PayloadChannel::new(payload),
        Arc::clone(&state.settlement),
    )
    .with_policy(state.config.settlement.policy())
    .with_scan_options(ScanOptions {
        source: scan.source.clone(),
        params: scan.parameters(),
        strict: state.strict_decoding(),
    });

    workflow.start_scanning().await?;
    let pending = workflow.next_scan().await?;
    let fallback = pending.fallback.as_ref().map(|r| r.0.clone());
    let claim = match state.pickups.claim(&pending.record.pickup_id) {
        Ok(claim) => claim,
        Err(e) => {
            warn!(request_id = %request_id.0, error = %e, "Refusing duplicate pickup");
            workflow.close();
            return Err(e.into());
        }
    };

    let receipt = match workflow.confirm().await {
        Ok(receipt) => receipt,
        Err(e) => {
            claim.release();
            workflow.close();
            return Err(e.into());
        }
    };
    claim.settled(receipt.transaction_id.clone());

    Ok(Json(VerifyResponse {
        success: true,
        receipt,
        fallback,
    }))
}
