//! API key authentication and request correlation.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::state::AppState;

/// Validate `X-Api-Key` or `Authorization: Bearer` against `config.api_key`.
/// Open when no key is configured.
pub async fn api_key_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let expected = match state.config.api_key.as_deref() {
        Some(key) if !key.is_empty() => key,
        _ => return next.run(request).await,
    };

    let headers = request.headers();
    let provided = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
        });

    let authorized = provided.is_some_and(|key| {
        key.len() == expected.len() && bool::from(key.as_bytes().ct_eq(expected.as_bytes()))
    });

    if authorized {
        next.run(request).await
    } else {
        let body = serde_json::json!({
            "success": false,
            "error": "Unauthorized: invalid or missing API key"
        });
        (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
    }
}

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest caller-supplied id that is echoed back unchanged.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Request correlation ID, extractable from `Request::extensions()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    /// `t2c-` followed by 16 random hex digits.
    pub fn generate() -> Self {
        use rand::Rng;
        Self(format!("t2c-{:016x}", rand::thread_rng().gen::<u64>()))
    }

    /// The caller's id, if it is short printable ASCII without spaces.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let value = headers.get(REQUEST_ID_HEADER)?.to_str().ok()?;
        let usable = !value.is_empty()
            && value.len() <= MAX_REQUEST_ID_LEN
            && value.bytes().all(|b| b.is_ascii_graphic());
        usable.then(|| Self(value.to_string()))
    }
}

/// Attach a [`RequestId`] to the request before tracing sees it and echo it
/// on the response. Unusable caller ids are replaced.
pub async fn inject_request_id(mut request: Request, next: Next) -> Response {
    let id = RequestId::from_headers(request.headers()).unwrap_or_else(RequestId::generate);
    let echoed = HeaderValue::from_str(&id.0).ok();
    request.extensions_mut().insert(id);

    let mut response = next.run(request).await;
    if let Some(value) = echoed {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Span for one HTTP request, carrying its correlation id.
pub fn request_span<B>(request: &axum::http::Request<B>) -> tracing::Span {
    let id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.as_str())
        .unwrap_or("-");
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %id,
    )
}
