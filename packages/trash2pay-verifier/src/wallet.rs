//! HandCash Connect REST client.
//!
//! Every call is made on behalf of a user auth token and carries the app
//! credentials in `app-id` / `app-secret` headers.

use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::WalletConfig;
use crate::metrics::METRICS;
use crate::session::{WalletKind, WalletSession};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Wallet API failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// App id or secret missing from configuration.
    NotConfigured,
    /// Request never got a response.
    Transport(String),
    /// Non-success HTTP status.
    Status { status: u16, body: String },
    /// Response body did not match the expected shape.
    Decode(String),
}

impl WalletError {
    /// Transient failures worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => matches!(status, 408 | 429 | 500 | 502 | 503 | 504),
            Self::NotConfigured | Self::Decode(_) => false,
        }
    }
}

impl std::fmt::Display for WalletError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConfigured => write!(f, "HandCash credentials not configured"),
            Self::Transport(msg) => write!(f, "wallet API unreachable: {msg}"),
            Self::Status { status, body } => write!(f, "wallet API returned {status}: {body}"),
            Self::Decode(msg) => write!(f, "unexpected wallet API response: {msg}"),
        }
    }
}

impl std::error::Error for WalletError {}

// --- HandCash REST API types ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceiver {
    pub destination: String,
    pub currency_code: String,
    pub send_amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub description: String,
    pub receivers: Vec<PaymentReceiver>,
    pub app_action: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    pub transaction_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub paymail: Option<String>,
}

impl PublicProfile {
    /// Session for this profile, if it carries a handle.
    pub fn into_session(self, auth_token: Option<String>) -> Option<WalletSession> {
        let handle = self.handle?;
        Some(WalletSession {
            handle,
            display_name: self.display_name,
            avatar_url: self.avatar_url,
            paymail: self.paymail,
            kind: WalletKind::HandCash,
            auth_token,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentUserProfile {
    #[serde(default)]
    public_profile: Option<PublicProfile>,
}

struct Credentials<'a> {
    app_id: &'a str,
    app_secret: &'a str,
}

/// HandCash Connect client.
pub struct HandCashClient {
    http: reqwest::Client,
    api_url: String,
    connect_url: String,
    app_id: Option<String>,
    app_secret: Option<String>,
    explorer_tx_url: String,
}

impl HandCashClient {
    pub fn new(config: &WalletConfig) -> Result<Self, crate::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| crate::Error::Config(format!("HTTP client build failed: {e}")))?;

        if config.app_id.is_none() || config.app_secret.is_none() {
            warn!("HandCash credentials not configured; wallet endpoints will fail");
        }

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            connect_url: config.connect_url.trim_end_matches('/').to_string(),
            app_id: config.app_id.clone(),
            app_secret: config.app_secret.clone(),
            explorer_tx_url: config.explorer_tx_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }

    fn credentials(&self) -> Result<Credentials<'_>, WalletError> {
        match (self.app_id.as_deref(), self.app_secret.as_deref()) {
            (Some(app_id), Some(app_secret)) => Ok(Credentials { app_id, app_secret }),
            _ => Err(WalletError::NotConfigured),
        }
    }

    /// Where to send a user to authorize this app.
    pub fn redirect_url(&self) -> Result<String, WalletError> {
        let creds = self.credentials()?;
        Ok(format!(
            "{}/#/authorizeApp?appId={}",
            self.connect_url, creds.app_id
        ))
    }

    /// Block explorer link for a transaction.
    pub fn explorer_url(&self, transaction_id: &str) -> String {
        format!("{}/{}", self.explorer_tx_url, transaction_id)
    }

    /// Verify an auth token by fetching its owner's public profile.
    pub async fn current_user_profile(&self, auth_token: &str) -> Result<PublicProfile, WalletError> {
        let creds = self.credentials()?;
        let url = format!("{}/v2/users/currentUserProfile", self.api_url);

        let resp = self
            .http
            .get(&url)
            .bearer_auth(auth_token)
            .header("app-id", creds.app_id)
            .header("app-secret", creds.app_secret)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let profile: CurrentUserProfile = Self::decode(resp).await?;
        let profile = profile.public_profile.unwrap_or_default();
        debug!(handle = profile.handle.as_deref().unwrap_or("-"), "HandCash profile verified");
        Ok(profile)
    }

    /// Pay from the wallet owning `auth_token`.
    pub async fn pay(
        &self,
        auth_token: &str,
        payment: &PaymentRequest,
    ) -> Result<PaymentResult, WalletError> {
        let creds = self.credentials()?;
        let url = format!("{}/v3/pay", self.api_url);

        info!(
            action = %payment.app_action,
            receivers = payment.receivers.len(),
            "Submitting HandCash payment"
        );

        let resp = self
            .http
            .post(&url)
            .bearer_auth(auth_token)
            .header("app-id", creds.app_id)
            .header("app-secret", creds.app_secret)
            .json(payment)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let result: PaymentResult = Self::decode(resp).await?;
        info!(tx = %result.transaction_id, "HandCash payment accepted");
        Ok(result)
    }

    fn transport_error(&self, e: reqwest::Error) -> WalletError {
        METRICS.wallet_errors.fetch_add(1, Ordering::Relaxed);
        warn!(error = %e, "HandCash request failed");
        WalletError::Transport(e.to_string())
    }

    async fn decode<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, WalletError> {
        let status = resp.status();
        if !status.is_success() {
            METRICS.wallet_errors.fetch_add(1, Ordering::Relaxed);
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "HandCash request rejected");
            return Err(WalletError::Status {
                status: status.as_u16(),
                body,
            });
        }
        resp.json::<T>()
            .await
            .map_err(|e| WalletError::Decode(e.to_string()))
    }
}
