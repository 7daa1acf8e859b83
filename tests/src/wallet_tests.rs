//! HandCash client against the local mock wallet API.

use anyhow::Result;
use std::sync::atomic::Ordering;
use trash2pay_verifier::wallet::{HandCashClient, PaymentReceiver, PaymentRequest, WalletError};

use crate::utils::{spawn_mock_wallet, wallet_config, GOOD_TOKEN};

fn tip(amount: u64) -> PaymentRequest {
    PaymentRequest {
        description: "tip".into(),
        receivers: vec![PaymentReceiver {
            destination: "alice".into(),
            currency_code: "SAT".into(),
            send_amount: amount,
        }],
        app_action: "tip".into(),
    }
}

#[tokio::test]
async fn test_profile_lookup() -> Result<()> {
    let mock = spawn_mock_wallet().await?;
    let client = HandCashClient::new(&wallet_config(&mock.url))?;

    let profile = client.current_user_profile(GOOD_TOKEN).await?;
    assert_eq!(profile.handle.as_deref(), Some("alice"));

    let session = profile
        .into_session(Some(GOOD_TOKEN.into()))
        .ok_or_else(|| anyhow::anyhow!("profile without handle"))?;
    assert_eq!(session.payout_destination(), "alice");
    Ok(())
}

#[tokio::test]
async fn test_rejected_token_is_not_retryable() -> Result<()> {
    let mock = spawn_mock_wallet().await?;
    let client = HandCashClient::new(&wallet_config(&mock.url))?;

    let err = client.current_user_profile("expired").await.unwrap_err();
    assert!(matches!(err, WalletError::Status { status: 401, .. }));
    assert!(!err.is_retryable());
    Ok(())
}

#[tokio::test]
async fn test_unavailable_wallet_is_retryable() -> Result<()> {
    let mock = spawn_mock_wallet().await?;
    mock.fail_next.store(1, Ordering::SeqCst);
    let client = HandCashClient::new(&wallet_config(&mock.url))?;

    let err = client.pay(GOOD_TOKEN, &tip(10)).await.unwrap_err();
    assert!(err.is_retryable());

    let result = client.pay(GOOD_TOKEN, &tip(10)).await?;
    assert_eq!(result.transaction_id, "tx-0001");
    Ok(())
}

#[tokio::test]
async fn test_unreachable_wallet_is_transport_error() -> Result<()> {
    // Nothing listens on the discard port.
    let client = HandCashClient::new(&wallet_config("http://127.0.0.1:9"))?;
    let err = client.pay(GOOD_TOKEN, &tip(1)).await.unwrap_err();
    assert!(matches!(err, WalletError::Transport(_)));
    Ok(())
}

#[tokio::test]
async fn test_unconfigured_client_never_calls_out() -> Result<()> {
    let mut config = wallet_config("http://127.0.0.1:9");
    config.app_secret = None;
    let client = HandCashClient::new(&config)?;
    let err = client.current_user_profile(GOOD_TOKEN).await.unwrap_err();
    assert_eq!(err, WalletError::NotConfigured);
    Ok(())
}
