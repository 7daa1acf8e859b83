//! Confirmation workflow against real channels and settlement backends.

use anyhow::Result;
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use trash2pay_verifier::channel::{LineScanner, PayloadChannel};
use trash2pay_verifier::session::WalletSession;
use trash2pay_verifier::settlement::{
    HandCashSettlement, Settled, Settlement, SettlementError, SettlementPolicy, SettlementRequest,
    SimulatedSettlement,
};
use trash2pay_verifier::wallet::HandCashClient;
use trash2pay_verifier::{Phase, Workflow, WorkflowError};

use crate::utils::{spawn_mock_wallet, wallet_config, BROKE_TOKEN, GOOD_TOKEN};

fn fast_policy(max_retries: u32) -> SettlementPolicy {
    SettlementPolicy {
        timeout: Duration::from_millis(200),
        max_retries,
        base_delay: Duration::from_millis(1),
    }
}

fn ewaste_payload(wallet: Option<&str>) -> String {
    let mut payload = json!({
        "pickupId": "pickup-ewaste-1",
        "userId": "user-42",
        "userName": "Grace",
        "wasteType": "E-Waste",
        "weight": 4
    });
    if let Some(wallet) = wallet {
        payload["userWallet"] = json!(wallet);
    }
    payload.to_string()
}

struct Hanging;

impl Settlement for Hanging {
    async fn settle(&self, _request: &SettlementRequest) -> Result<Settled, SettlementError> {
        std::future::pending().await
    }
}

// ── Line scanner ────────────────────────────────────────────────────

#[tokio::test]
async fn test_line_scanner_scan_and_confirm() -> Result<()> {
    let (reader, mut writer) = tokio::io::duplex(1024);
    let mut workflow = Workflow::new(
        WalletSession::handcash("collector-bob"),
        LineScanner::new(reader),
        SimulatedSettlement::new(Duration::ZERO),
    )
    .with_policy(fast_policy(0));

    workflow.start_scanning().await?;
    assert!(workflow.channel().is_running());

    writer.write_all(b"\n").await?;
    writer
        .write_all(
            br#"{"pickupId":"p-9","userId":"u-1","userName":"Bob","wasteType":"Organic","weight":"4","userWallet":"bob"}"#,
        )
        .await?;
    writer.write_all(b"\n").await?;

    let pending = workflow.next_scan().await?;
    assert_eq!(pending.record.pickup_id, "p-9");
    assert_eq!(pending.record.weight_kg, Some(4.0));
    assert_eq!(pending.quote.total_tokens, 7);
    assert_eq!(pending.quote.requester_share, 5);
    assert_eq!(pending.quote.collector_share, 2);
    assert!(pending.fallback.is_none());
    assert!(!workflow.channel().is_running());

    let receipt = workflow.confirm().await?;
    assert_eq!(receipt.record.pickup_id, "p-9");
    assert_eq!(receipt.collector, "collector-bob");
    assert_eq!(receipt.attempts, 1);
    assert_eq!(workflow.phase(), Phase::Idle);
    Ok(())
}

#[tokio::test]
async fn test_scanner_stream_end_returns_to_idle() -> Result<()> {
    let (reader, writer) = tokio::io::duplex(64);
    let mut workflow = Workflow::new(
        WalletSession::handcash("collector"),
        LineScanner::new(reader),
        SimulatedSettlement::new(Duration::ZERO),
    );

    workflow.start_scanning().await?;
    drop(writer);

    let err = workflow.next_scan().await.unwrap_err();
    assert!(matches!(err, WorkflowError::Acquisition(_)));
    assert_eq!(workflow.phase(), Phase::Idle);

    // Nothing was scanned, so there is nothing to confirm.
    let err = workflow.confirm().await.unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
    Ok(())
}

#[tokio::test]
async fn test_garbage_line_falls_back_to_demo_record() -> Result<()> {
    let (reader, mut writer) = tokio::io::duplex(256);
    let mut workflow = Workflow::new(
        WalletSession::handcash("collector"),
        LineScanner::new(reader),
        SimulatedSettlement::new(Duration::ZERO),
    );

    workflow.start_scanning().await?;
    writer.write_all(b"https://not-a-pickup.example\n").await?;

    let pending = workflow.next_scan().await?;
    assert!(pending.fallback.is_some());
    assert_eq!(pending.record.requester_id, "user-123");
    assert_eq!(pending.record.weight_kg, Some(2.5));
    assert_eq!(pending.quote.total_tokens, 11);
    Ok(())
}

// ── HandCash settlement ─────────────────────────────────────────────

fn handcash_workflow(
    api_url: &str,
    token: &str,
    payload: String,
    max_retries: u32,
) -> Result<Workflow<PayloadChannel, HandCashSettlement>> {
    let client = Arc::new(HandCashClient::new(&wallet_config(api_url))?);
    let backend = HandCashSettlement::new(client, token.to_string(), "SAT".into());
    Ok(Workflow::new(
        WalletSession::handcash("collector"),
        PayloadChannel::new(payload),
        backend,
    )
    .with_policy(fast_policy(max_retries)))
}

#[tokio::test]
async fn test_handcash_settlement_pays_both_shares() -> Result<()> {
    let mock = spawn_mock_wallet().await?;
    let mut workflow =
        handcash_workflow(&mock.url, GOOD_TOKEN, ewaste_payload(Some("grace")), 0)?;

    workflow.start_scanning().await?;
    workflow.next_scan().await?;
    let receipt = workflow.confirm().await?;

    assert_eq!(receipt.transaction_id.as_deref(), Some("tx-0001"));
    assert_eq!(
        receipt.explorer_url.as_deref(),
        Some("https://whatsonchain.com/tx/tx-0001")
    );

    let payments = mock.payments();
    assert_eq!(payments.len(), 1);
    let payment = &payments[0];
    assert_eq!(payment["appAction"], "pickup-reward");
    assert!(payment["description"]
        .as_str()
        .unwrap_or_default()
        .contains("pickup-ewaste-1"));
    assert_eq!(payment["receivers"][0]["destination"], "grace");
    assert_eq!(payment["receivers"][0]["sendAmount"], 12);
    assert_eq!(payment["receivers"][1]["destination"], "collector");
    assert_eq!(payment["receivers"][1]["sendAmount"], 5);
    Ok(())
}

#[tokio::test]
async fn test_transient_wallet_failure_is_retried() -> Result<()> {
    let mock = spawn_mock_wallet().await?;
    mock.fail_next.store(1, Ordering::SeqCst);
    let mut workflow =
        handcash_workflow(&mock.url, GOOD_TOKEN, ewaste_payload(Some("grace")), 2)?;

    workflow.start_scanning().await?;
    workflow.next_scan().await?;
    let receipt = workflow.confirm().await?;

    assert_eq!(receipt.attempts, 2);
    assert_eq!(mock.payments().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_rejected_payment_keeps_pickup_for_retry() -> Result<()> {
    let mock = spawn_mock_wallet().await?;
    let mut workflow =
        handcash_workflow(&mock.url, BROKE_TOKEN, ewaste_payload(Some("grace")), 3)?;

    workflow.start_scanning().await?;
    workflow.next_scan().await?;
    let err = workflow.confirm().await.unwrap_err();

    assert!(matches!(err, WorkflowError::Settlement { attempts: 1, .. }));
    assert_eq!(workflow.phase(), Phase::Scanned);
    let pending = workflow.pending().unwrap();
    assert_eq!(pending.record.pickup_id, "pickup-ewaste-1");
    assert_eq!(pending.quote.total_tokens, 17);
    assert!(mock.payments().is_empty());

    workflow.close();
    assert_eq!(workflow.phase(), Phase::Idle);
    Ok(())
}

#[tokio::test]
async fn test_missing_requester_wallet_pays_collector_only() -> Result<()> {
    let mock = spawn_mock_wallet().await?;
    let mut workflow = handcash_workflow(&mock.url, GOOD_TOKEN, ewaste_payload(None), 0)?;

    workflow.start_scanning().await?;
    workflow.next_scan().await?;
    workflow.confirm().await?;

    let payments = mock.payments();
    let receivers = payments[0]["receivers"].as_array().cloned().unwrap_or_default();
    assert_eq!(receivers.len(), 1);
    assert_eq!(receivers[0]["destination"], "collector");
    Ok(())
}

#[tokio::test]
async fn test_settlement_timeout_reverts_to_scanned() -> Result<()> {
    let mut workflow = Workflow::new(
        WalletSession::handcash("collector"),
        PayloadChannel::new(ewaste_payload(None)),
        Hanging,
    )
    .with_policy(SettlementPolicy {
        timeout: Duration::from_millis(20),
        max_retries: 1,
        base_delay: Duration::from_millis(1),
    });

    workflow.start_scanning().await?;
    workflow.next_scan().await?;
    let err = workflow.confirm().await.unwrap_err();

    assert_eq!(err, WorkflowError::SettlementTimeout { attempts: 2 });
    assert_eq!(workflow.phase(), Phase::Scanned);
    assert_eq!(
        workflow.pending().map(|p| p.record.pickup_id.as_str()),
        Some("pickup-ewaste-1")
    );
    Ok(())
}
