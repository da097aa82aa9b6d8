use axum::http::HeaderMap;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    dto::orders::{PaymentStatusView, WebhookAck},
    error::{AppError, AppResult},
    models::PaymentStatus,
    payments::{
        PixCheckout,
        gateway::ChargeState,
        materializer::Materialization,
        webhook::{extract_notice, signature_matches},
    },
};

impl PixCheckout {
    /// Push path: the provider tells us a charge was paid.
    pub async fn handle_webhook(&self, headers: &HeaderMap, payload: &Value) -> AppResult<WebhookAck> {
        if !signature_matches(headers, self.webhook_secret.as_deref()) {
            tracing::warn!("webhook rejected: signature mismatch");
            return Err(AppError::Forbidden);
        }

        let Some(notice) = extract_notice(payload) else {
            tracing::info!("webhook without txid ignored");
            return Ok(WebhookAck::message("No txid in payload"));
        };

        let Some(pending) = self.pending.find_pending_by_txid(&notice.txid).await? else {
            tracing::info!(txid = %notice.txid, "webhook for unknown or already processed payment");
            return Ok(WebhookAck::message("No pending payment for this txid"));
        };

        let paid_at = notice.paid_at.unwrap_or_else(Utc::now);
        let outcome = self.materializer.confirm(&pending, paid_at).await?;
        Ok(WebhookAck {
            ok: true,
            message: None,
            order_id: outcome.order().map(|o| o.id),
            created: matches!(outcome, Materialization::Created(_)),
        })
    }

    /// Pull path: the buyer's client asks whether its payment went through.
    pub async fn poll_status(&self, user_id: Uuid, pending_id: Uuid) -> AppResult<PaymentStatusView> {
        let pending = self
            .pending
            .find_for_owner(pending_id, user_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if pending.status == PaymentStatus::Paid {
            return Ok(match self.ledger.find_by_txid(user_id, &pending.txid).await? {
                Some(order) => PaymentStatusView::paid(&order),
                None => PaymentStatusView::status(PaymentStatus::Paid.as_str()),
            });
        }

        let stored = PaymentStatusView::status(pending.status.as_str());
        let charge = match self.gateway.charge_status(&pending.txid).await {
            Ok(charge) => charge,
            Err(err) => {
                tracing::warn!(error = %err, txid = %pending.txid, "charge status lookup failed");
                return Ok(PaymentStatusView {
                    detail: Some(format!("Could not reach the payment provider: {err}")),
                    ..stored
                });
            }
        };

        match charge.state {
            ChargeState::Paid => {
                if let Some(amount) = charge.amount.filter(|a| *a != pending.total_amount) {
                    tracing::warn!(
                        txid = %pending.txid,
                        charged = amount,
                        expected = pending.total_amount,
                        "paid amount differs from pending total"
                    );
                }
                let paid_at = charge.paid_at.unwrap_or_else(Utc::now);
                let outcome = self.materializer.confirm(&pending, paid_at).await?;
                Ok(match outcome.order() {
                    Some(order) => PaymentStatusView {
                        created: matches!(outcome, Materialization::Created(_)),
                        ..PaymentStatusView::paid(order)
                    },
                    None => stored,
                })
            }
            ChargeState::Cancelled => Ok(PaymentStatusView::status("cancelled")),
            ChargeState::Pending | ChargeState::NotFound => Ok(stored),
        }
    }
}
