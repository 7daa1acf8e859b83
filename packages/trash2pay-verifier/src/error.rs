//! Error types for the verifier service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::fmt;

use crate::ledger::ClaimError;
use crate::wallet::WalletError;
use crate::workflow::WorkflowError;

/// Verifier error type.
#[derive(Debug)]
pub enum Error {
    /// Configuration error.
    Config(String),
    /// Malformed or incomplete request.
    BadRequest(String),
    /// HandCash wallet API failure.
    Wallet(WalletError),
    /// Pickup workflow failure.
    Workflow(WorkflowError),
    /// The pickup was already paid or is being paid by another request.
    Duplicate(ClaimError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "config error: {msg}"),
            Error::BadRequest(msg) => f.write_str(msg),
            Error::Wallet(e) => write!(f, "{e}"),
            Error::Workflow(e) => write!(f, "{e}"),
            Error::Duplicate(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<WalletError> for Error {
    fn from(e: WalletError) -> Self {
        Error::Wallet(e)
    }
}

impl From<WorkflowError> for Error {
    fn from(e: WorkflowError) -> Self {
        Error::Workflow(e)
    }
}

impl From<ClaimError> for Error {
    fn from(e: ClaimError) -> Self {
        Error::Duplicate(e)
    }
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Wallet(_) => StatusCode::BAD_REQUEST,
            Error::Duplicate(_) => StatusCode::CONFLICT,
            Error::Workflow(e) => match e {
                WorkflowError::Acquisition(_) | WorkflowError::Decode(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                WorkflowError::InvalidTransition { .. } => StatusCode::CONFLICT,
                WorkflowError::SettlementTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                WorkflowError::Settlement { .. } => StatusCode::BAD_GATEWAY,
            },
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "success": false,
            "error": self.to_string()
        });
        (self.status(), Json(body)).into_response()
    }
}
