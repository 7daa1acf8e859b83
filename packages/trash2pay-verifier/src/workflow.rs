//! Pickup confirmation workflow.
//!
//! ```text
//!            start_scanning            decode              confirm
//!   Idle ─────────────────▶ Scanning ─────────▶ Scanned ─────────▶ Confirming
//!    ▲                        ▲  │                │  │                  │
//!    │          rescan        │  │ close          │  │ close            │ settled
//!    │                        └──┼────────────────┘  │                  │
//!    └───────────────────────────┴───────────────────┴──────────────────┘
//! ```
//!
//! A workflow owns at most one pickup at a time. The settlement side effect
//! runs only from `Scanned` and the record is consumed by a successful
//! settlement, so a pickup can never be paid twice. `confirm` takes
//! `&mut self`; nothing else can touch the workflow while a settlement is in
//! flight. A failed or timed-out settlement returns to `Scanned` with the
//! same record so the operator can retry without rescanning.

use serde::Serialize;
use std::sync::atomic::Ordering;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use trash2pay_types::{
    interpret_scan, interpret_strict, DecodeError, FallbackReason, PickupRecord, RewardQuote,
    ScanOutcome,
};

use crate::channel::{AcquisitionChannel, ScanEvent, ScanParameters, ScanSource};
use crate::metrics::METRICS;
use crate::session::WalletSession;
use crate::settlement::{
    Settlement, SettlementFailure, SettlementPolicy, SettlementRequest,
};

/// Workflow state without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Scanning,
    Scanned,
    Confirming,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Scanned => "scanned",
            Self::Confirming => "confirming",
        };
        f.write_str(name)
    }
}

/// A scanned pickup awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPickup {
    pub record: PickupRecord,
    pub quote: RewardQuote,
    /// Set when the record is the placeholder substituted for an unreadable
    /// code.
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "reason_text")]
    pub fallback: Option<FallbackReason>,
}

fn reason_text<S: serde::Serializer>(
    reason: &Option<FallbackReason>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match reason {
        Some(r) => serializer.serialize_str(&r.0),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum State {
    Idle,
    Scanning,
    Scanned(PendingPickup),
    Confirming(PendingPickup),
}

impl State {
    fn phase(&self) -> Phase {
        match self {
            Self::Idle => Phase::Idle,
            Self::Scanning => Phase::Scanning,
            Self::Scanned(_) => Phase::Scanned,
            Self::Confirming(_) => Phase::Confirming,
        }
    }
}

/// Outcome of a successful confirmation. Owns the consumed record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReceipt {
    pub record: PickupRecord,
    pub quote: RewardQuote,
    pub collector: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowError {
    /// The acquisition channel could not start or stopped delivering.
    Acquisition(String),
    /// A code was read but rejected by strict decoding.
    Decode(DecodeError),
    /// The operation is not valid in the current phase.
    InvalidTransition { action: &'static str, phase: Phase },
    /// Every settlement attempt hit its deadline.
    SettlementTimeout { attempts: u32 },
    /// The settlement backend refused or kept failing.
    Settlement { attempts: u32, message: String },
}

impl std::fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Acquisition(msg) => write!(f, "could not access scanner: {msg}"),
            Self::Decode(e) => write!(f, "{e}"),
            Self::InvalidTransition { action, phase } => {
                write!(f, "cannot {action} while {phase}")
            }
            Self::SettlementTimeout { attempts } => {
                write!(f, "reward distribution timed out after {attempts} attempt(s)")
            }
            Self::Settlement { attempts, message } => {
                write!(f, "reward distribution failed after {attempts} attempt(s): {message}")
            }
        }
    }
}

impl std::error::Error for WorkflowError {}

/// How the workflow reads codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    pub source: ScanSource,
    pub params: ScanParameters,
    /// Reject unreadable codes instead of substituting the demo record.
    pub strict: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            source: ScanSource::Environment,
            params: ScanParameters::default(),
            strict: false,
        }
    }
}

/// Scan → quote → confirm state machine for one collector.
pub struct Workflow<C, S> {
    session: WalletSession,
    channel: C,
    settlement: S,
    policy: SettlementPolicy,
    scan: ScanOptions,
    state: State,
    /// Present exactly while the channel is running.
    events: Option<mpsc::UnboundedReceiver<ScanEvent>>,
}

impl<C, S> Workflow<C, S>
where
    C: AcquisitionChannel,
    S: Settlement,
{
    pub fn new(session: WalletSession, channel: C, settlement: S) -> Self {
        Self {
            session,
            channel,
            settlement,
            policy: SettlementPolicy::default(),
            scan: ScanOptions::default(),
            state: State::Idle,
            events: None,
        }
    }

    pub fn with_policy(mut self, policy: SettlementPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_scan_options(mut self, scan: ScanOptions) -> Self {
        self.scan = scan;
        self
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn session(&self) -> &WalletSession {
        &self.session
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// The scanned pickup, in `Scanned` or `Confirming`.
    pub fn pending(&self) -> Option<&PendingPickup> {
        match &self.state {
            State::Scanned(p) | State::Confirming(p) => Some(p),
            State::Idle | State::Scanning => None,
        }
    }

    /// Idle → Scanning. On channel failure the workflow stays idle.
    pub async fn start_scanning(&mut self) -> Result<(), WorkflowError> {
        self.expect_phase("start scanning", Phase::Idle)?;
        self.open_channel().await
    }

    /// Scanned → Scanning, discarding the scanned pickup.
    pub async fn rescan(&mut self) -> Result<(), WorkflowError> {
        self.expect_phase("rescan", Phase::Scanned)?;
        if let Some(p) = self.pending() {
            debug!(pickup_id = %p.record.pickup_id, "Discarding scanned pickup");
        }
        self.state = State::Idle;
        self.open_channel().await
    }

    /// Feed one channel event. Returns the pending pickup once a code is
    /// accepted; misses and events outside `Scanning` are ignored.
    pub fn handle_scan_event(
        &mut self,
        event: ScanEvent,
    ) -> Result<Option<&PendingPickup>, WorkflowError> {
        if self.phase() != Phase::Scanning {
            debug!(phase = %self.phase(), "Ignoring scan event");
            return Ok(None);
        }
        match event {
            ScanEvent::Miss(reason) => {
                debug!(reason = %reason, "No code in frame");
                Ok(None)
            }
            ScanEvent::Decoded(raw) => {
                self.accept_payload(&raw)?;
                Ok(self.pending())
            }
        }
    }

    /// Wait on the channel until a code is accepted.
    ///
    /// In strict mode unreadable codes are skipped and listening continues.
    /// If the channel stops delivering, the workflow returns to `Idle`.
    pub async fn next_scan(&mut self) -> Result<&PendingPickup, WorkflowError> {
        self.expect_phase("wait for a scan", Phase::Scanning)?;
        loop {
            let event = match self.events.as_mut() {
                Some(rx) => rx.recv().await,
                None => None,
            };
            match event {
                None => {
                    METRICS.acquisition_errors.fetch_add(1, Ordering::Relaxed);
                    warn!("Scan channel closed before a code was read");
                    self.stop_channel();
                    self.state = State::Idle;
                    return Err(WorkflowError::Acquisition(
                        "scan channel closed without a readable code".into(),
                    ));
                }
                Some(ScanEvent::Miss(reason)) => {
                    debug!(reason = %reason, "No code in frame");
                }
                Some(ScanEvent::Decoded(raw)) => match self.accept_payload(&raw) {
                    Ok(()) => break,
                    Err(WorkflowError::Decode(e)) => {
                        warn!(error = %e, "Unreadable pickup code, still scanning");
                    }
                    Err(e) => return Err(e),
                },
            }
        }
        match &self.state {
            State::Scanned(p) => Ok(p),
            other => Err(WorkflowError::InvalidTransition {
                action: "wait for a scan",
                phase: other.phase(),
            }),
        }
    }

    /// Inject a payload as if it had been scanned (the demo button).
    /// Valid while idle or scanning.
    pub fn simulate_scan(&mut self, raw: &str) -> Result<&PendingPickup, WorkflowError> {
        match self.phase() {
            Phase::Idle | Phase::Scanning => {}
            phase => {
                return Err(WorkflowError::InvalidTransition {
                    action: "simulate a scan",
                    phase,
                })
            }
        }
        self.accept_payload(raw)?;
        match &self.state {
            State::Scanned(p) => Ok(p),
            other => Err(WorkflowError::InvalidTransition {
                action: "simulate a scan",
                phase: other.phase(),
            }),
        }
    }

    /// Scanned → Confirming → Idle.
    ///
    /// Settles the pending quote and consumes the record. On failure the
    /// workflow goes back to `Scanned` with the record intact.
    pub async fn confirm(&mut self) -> Result<SettlementReceipt, WorkflowError> {
        let pending = match std::mem::replace(&mut self.state, State::Idle) {
            State::Scanned(p) => p,
            other => {
                let phase = other.phase();
                self.state = other;
                return Err(WorkflowError::InvalidTransition {
                    action: "confirm",
                    phase,
                });
            }
        };

        let collector = self.session.payout_destination().to_string();
        let request = SettlementRequest::new(&pending.record, pending.quote, &collector);
        info!(
            pickup_id = %request.pickup_id,
            total = pending.quote.total_tokens,
            collector = %collector,
            "Confirming pickup"
        );
        self.state = State::Confirming(pending.clone());

        match self.policy.run(&self.settlement, &request).await {
            Ok((settled, attempts)) => {
                self.state = State::Idle;
                METRICS.settlements_ok.fetch_add(1, Ordering::Relaxed);
                METRICS
                    .tokens_distributed
                    .fetch_add(pending.quote.total_tokens, Ordering::Relaxed);
                Ok(SettlementReceipt {
                    record: pending.record,
                    quote: pending.quote,
                    collector,
                    transaction_id: settled.transaction_id,
                    explorer_url: settled.explorer_url,
                    attempts,
                })
            }
            Err(failure) => {
                self.state = State::Scanned(pending);
                Err(match failure {
                    SettlementFailure::TimedOut { attempts } => {
                        METRICS.settlement_timeouts.fetch_add(1, Ordering::Relaxed);
                        WorkflowError::SettlementTimeout { attempts }
                    }
                    SettlementFailure::Failed { attempts, error } => {
                        METRICS.settlements_failed.fetch_add(1, Ordering::Relaxed);
                        WorkflowError::Settlement {
                            attempts,
                            message: error.to_string(),
                        }
                    }
                })
            }
        }
    }

    /// Stop any running channel and drop the pickup. Always ends `Idle`.
    ///
    /// Also recovers a workflow left in `Confirming` by an abandoned
    /// `confirm` future.
    pub fn close(&mut self) {
        match self.phase() {
            Phase::Idle => {}
            Phase::Confirming => {
                warn!("Closing workflow with an abandoned settlement");
            }
            phase => debug!(phase = %phase, "Closing workflow"),
        }
        self.stop_channel();
        self.state = State::Idle;
    }

    fn expect_phase(&self, action: &'static str, expected: Phase) -> Result<(), WorkflowError> {
        let phase = self.phase();
        if phase == expected {
            Ok(())
        } else {
            Err(WorkflowError::InvalidTransition { action, phase })
        }
    }

    async fn open_channel(&mut self) -> Result<(), WorkflowError> {
        let (tx, rx) = mpsc::unbounded_channel();
        match self
            .channel
            .start(&self.scan.source, &self.scan.params, tx)
            .await
        {
            Ok(()) => {
                self.events = Some(rx);
                self.state = State::Scanning;
                info!(collector = %self.session.handle, "Scanning for pickup codes");
                Ok(())
            }
            Err(e) => {
                METRICS.acquisition_errors.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "Failed to start scanner");
                self.events = None;
                self.state = State::Idle;
                Err(WorkflowError::Acquisition(e.0))
            }
        }
    }

    /// Best effort; stop failures are logged only.
    fn stop_channel(&mut self) {
        if self.events.take().is_some() {
            if let Err(e) = self.channel.stop() {
                warn!(error = %e, "Failed to stop scanner");
            }
        }
    }

    fn accept_payload(&mut self, raw: &str) -> Result<(), WorkflowError> {
        let outcome = if self.scan.strict {
            match interpret_strict(raw) {
                Ok(record) => ScanOutcome::Decoded(record),
                Err(e) => {
                    METRICS.scan_rejects.fetch_add(1, Ordering::Relaxed);
                    return Err(WorkflowError::Decode(e));
                }
            }
        } else {
            interpret_scan(raw)
        };

        self.stop_channel();
        METRICS.scans_total.fetch_add(1, Ordering::Relaxed);

        let fallback = outcome.fallback_reason().cloned();
        if let Some(reason) = &fallback {
            METRICS.scan_fallbacks.fetch_add(1, Ordering::Relaxed);
            warn!(reason = %reason, "Unreadable pickup code, using demo record");
        }

        let record = outcome.into_record();
        let quote = record.quote();
        info!(
            pickup_id = %record.pickup_id,
            waste = %record.waste_category,
            total = quote.total_tokens,
            "Pickup scanned"
        );
        self.state = State::Scanned(PendingPickup {
            record,
            quote,
            fallback,
        });
        Ok(())
    }
}
