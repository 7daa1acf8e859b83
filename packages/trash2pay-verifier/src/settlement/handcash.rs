//! Settlement through the HandCash Pay API.
//!
//! Both shares go out in one payment from the platform wallet, so either
//! everyone is paid or nobody is.

use std::sync::Arc;
use tracing::warn;

use super::{Settled, Settlement, SettlementError, SettlementRequest};
use crate::wallet::{HandCashClient, PaymentReceiver, PaymentRequest};

pub struct HandCashSettlement {
    client: Arc<HandCashClient>,
    /// Auth token of the platform wallet funding rewards.
    auth_token: String,
    currency_code: String,
}

impl HandCashSettlement {
    pub fn new(client: Arc<HandCashClient>, auth_token: String, currency_code: String) -> Self {
        Self {
            client,
            auth_token,
            currency_code,
        }
    }

    /// Receivers for a request. Zero shares and a missing requester wallet
    /// produce no receiver.
    pub fn receivers(&self, request: &SettlementRequest) -> Vec<PaymentReceiver> {
        let mut receivers = Vec::with_capacity(2);
        match &request.requester_destination {
            Some(destination) if request.quote.requester_share > 0 => {
                receivers.push(PaymentReceiver {
                    destination: destination.clone(),
                    currency_code: self.currency_code.clone(),
                    send_amount: request.quote.requester_share,
                });
            }
            Some(_) => {}
            None => warn!(
                pickup_id = %request.pickup_id,
                share = request.quote.requester_share,
                "Requester has no payout wallet, share withheld"
            ),
        }
        if request.quote.collector_share > 0 {
            receivers.push(PaymentReceiver {
                destination: request.collector_destination.clone(),
                currency_code: self.currency_code.clone(),
                send_amount: request.quote.collector_share,
            });
        }
        receivers
    }
}

impl Settlement for HandCashSettlement {
    async fn settle(&self, request: &SettlementRequest) -> Result<Settled, SettlementError> {
        let receivers = self.receivers(request);
        if receivers.is_empty() {
            return Err(SettlementError::Rejected(
                "no payout destination for any share".into(),
            ));
        }

        let payment = PaymentRequest {
            description: format!("Trash2Cash pickup reward - {}", request.pickup_id),
            receivers,
            app_action: "pickup-reward".into(),
        };

        match self.client.pay(&self.auth_token, &payment).await {
            Ok(result) => Ok(Settled {
                explorer_url: Some(self.client.explorer_url(&result.transaction_id)),
                transaction_id: Some(result.transaction_id),
            }),
            Err(e) if e.is_retryable() => Err(SettlementError::Transport(e.to_string())),
            Err(e) => Err(SettlementError::Rejected(e.to_string())),
        }
    }
}
