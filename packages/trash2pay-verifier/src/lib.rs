//! # Trash2Cash Pickup Verifier
//!
//! Verifies scanned pickup codes, quotes T2C rewards and settles them to the
//! requester and collector wallets. Also fronts the HandCash wallet API for
//! token verification and registration-fee payment.
//!
//! ## Quick Start
//! ```bash
//! cargo run --bin trash2pay-verifier
//! ```
//!
//! ## Endpoints
//! - `GET /health` - Health check
//! - `GET /metrics` - Prometheus metrics
//! - `POST /handcash-auth` - Redirect URL / token verification
//! - `POST /register-user` - Charge the registration fee
//! - `POST /quote` - Reward preview for a waste type and weight
//! - `POST /pickups/verify` - Interpret a pickup code and settle its reward

pub mod channel;
pub mod config;
mod error;
mod handlers;
pub mod ledger;
pub mod metrics;
mod middleware;
mod response;
mod router;
pub mod session;
pub mod settlement;
mod state;
pub mod wallet;
pub mod workflow;

pub use config::Config;
pub use error::Error;
pub use router::create as create_router;
pub use state::AppState;
pub use workflow::{PendingPickup, Phase, Workflow, WorkflowError};
