//! HTTP router setup.

use crate::handlers;
use crate::middleware::{api_key_auth, inject_request_id, request_span};
use crate::state::AppState;
use axum::body::Body;
use axum::http::{header, HeaderName, Method};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/register-user", post(handlers::register_user))
        .route("/pickups/verify", post(handlers::verify_pickup))
        .route_layer(from_fn_with_state(Arc::clone(&state), api_key_auth));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            HeaderName::from_static("x-api-key"),
            HeaderName::from_static("x-request-id"),
        ]);

    let max_concurrent = state.config.max_concurrent_requests.max(1);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/handcash-auth", post(handlers::handcash_auth))
        .route("/quote", post(handlers::quote_reward))
        .merge(protected)
        .layer(TraceLayer::new_for_http().make_span_with(request_span::<Body>))
        .layer(from_fn(inject_request_id))
        .layer(GlobalConcurrencyLimitLayer::new(max_concurrent))
        .layer(cors)
        .with_state(state)
}
