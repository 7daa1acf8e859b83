use anyhow::Result;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use trash2pay_verifier::config::{SettlementMode, WalletConfig};
use trash2pay_verifier::{create_router, AppState, Config};

pub const GOOD_TOKEN: &str = "good-token";
pub const BROKE_TOKEN: &str = "broke-token";
pub const APP_ID: &str = "test-app";
pub const APP_SECRET: &str = "test-secret";

/// In-process stand-in for the HandCash Connect API.
#[derive(Clone, Default)]
pub struct MockWallet {
    pub url: String,
    /// Every accepted `/v3/pay` body, in order.
    pub payments: Arc<Mutex<Vec<Value>>>,
    /// Number of upcoming pay calls to answer with 503.
    pub fail_next: Arc<AtomicU32>,
}

impl MockWallet {
    pub fn payments(&self) -> Vec<Value> {
        self.payments.lock().unwrap().clone()
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
}

fn has_app_credentials(headers: &HeaderMap) -> bool {
    headers.get("app-id").and_then(|v| v.to_str().ok()) == Some(APP_ID)
        && headers.get("app-secret").and_then(|v| v.to_str().ok()) == Some(APP_SECRET)
}

async fn profile(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !has_app_credentials(&headers) || bearer(&headers) != Some(GOOD_TOKEN) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Invalid auth token"})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "publicProfile": {
                "handle": "alice",
                "displayName": "Alice",
                "avatarUrl": "https://cdn.example/alice.png",
                "paymail": "alice@handcash.io"
            }
        })),
    )
}

async fn pay(
    State(mock): State<MockWallet>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !has_app_credentials(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "bad app"})));
    }
    if bearer(&headers) == Some(BROKE_TOKEN) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "Insufficient balance"})),
        );
    }
    let pending_failures = mock.fail_next.load(Ordering::SeqCst);
    if pending_failures > 0 {
        mock.fail_next.store(pending_failures - 1, Ordering::SeqCst);
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"message": "try again"})),
        );
    }
    let mut payments = mock.payments.lock().unwrap();
    payments.push(body);
    let tx = format!("tx-{:04}", payments.len());
    (StatusCode::OK, Json(json!({ "transactionId": tx })))
}

/// Serve the mock wallet API on an ephemeral local port.
pub async fn spawn_mock_wallet() -> Result<MockWallet> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let mock = MockWallet {
        url: format!("http://{}", listener.local_addr()?),
        ..MockWallet::default()
    };

    let app = Router::new()
        .route("/v2/users/currentUserProfile", get(profile))
        .route("/v3/pay", post(pay))
        .with_state(mock.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(mock)
}

pub fn wallet_config(api_url: &str) -> WalletConfig {
    WalletConfig {
        api_url: api_url.to_string(),
        app_id: Some(APP_ID.into()),
        app_secret: Some(APP_SECRET.into()),
        request_timeout_ms: 2_000,
        ..WalletConfig::default()
    }
}

/// Simulated settlement with no delay and fast retries.
pub fn test_config(api_url: &str) -> Config {
    let mut config = Config::default();
    config.api_key = None;
    config.wallet = wallet_config(api_url);
    config.settlement.mode = SettlementMode::Simulated;
    config.settlement.simulated_delay_ms = 0;
    config.settlement.timeout_ms = 1_000;
    config.settlement.base_delay_ms = 1;
    config.settlement.auth_token = None;
    config.scan.strict_decoding = false;
    config
}

pub fn test_app(config: Config) -> Result<Router> {
    Ok(create_router(Arc::new(AppState::new(config)?)))
}

/// Response status, headers and body (JSON, or a string for text bodies).
pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    headers: &[(&str, &str)],
) -> Result<Reply> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body)?))?,
        None => builder.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

    Ok(Reply {
        status,
        headers,
        body,
    })
}
