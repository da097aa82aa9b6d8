//! Exactly-once conversion of a confirmed PIX payment into an order.
//!
//! Webhook and poll may call [`OrderMaterializer::confirm`] for the same
//! txid at the same time. The order guard, the conditional pending->paid flip
//! and the unique txid on orders together leave exactly one order behind.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    models::{Order, PendingPayment},
    payments::{
        notifier::OrderNotifier,
        store::{CommitOutcome, Confirmation, OrderLedger, PendingPaymentStore, StockChange, StoreError},
    },
};

#[derive(Debug, Clone)]
pub enum Materialization {
    /// This call created the order.
    Created(Order),
    /// An order for the txid already existed.
    AlreadyMaterialized(Order),
    /// The payment is no longer pending and no order is visible for it.
    NothingToDo,
}

impl Materialization {
    pub fn order(&self) -> Option<&Order> {
        match self {
            Materialization::Created(order) | Materialization::AlreadyMaterialized(order) => {
                Some(order)
            }
            Materialization::NothingToDo => None,
        }
    }
}

pub struct OrderMaterializer {
    pending: Arc<dyn PendingPaymentStore>,
    ledger: Arc<dyn OrderLedger>,
    notifier: Arc<dyn OrderNotifier>,
}

impl OrderMaterializer {
    pub fn new(
        pending: Arc<dyn PendingPaymentStore>,
        ledger: Arc<dyn OrderLedger>,
        notifier: Arc<dyn OrderNotifier>,
    ) -> Self {
        Self {
            pending,
            ledger,
            notifier,
        }
    }

    pub async fn confirm(
        &self,
        intent: &PendingPayment,
        paid_at: DateTime<Utc>,
    ) -> Result<Materialization, StoreError> {
        if let Some(order) = self.ledger.find_by_txid(intent.user_id, &intent.txid).await? {
            tracing::debug!(txid = %intent.txid, order_id = %order.id, "order already exists");
            return Ok(Materialization::AlreadyMaterialized(order));
        }

        let Some(pending) = self.pending.find_pending_by_txid(&intent.txid).await? else {
            return self.settled(intent).await;
        };

        let outcome = self
            .ledger
            .commit(Confirmation::new(&pending, paid_at))
            .await?;
        let (order, stock) = match outcome {
            CommitOutcome::Created { order, stock } => (order, stock),
            CommitOutcome::Superseded => {
                tracing::info!(txid = %pending.txid, "confirmation superseded by a concurrent one");
                return self.settled(&pending).await;
            }
        };

        for change in &stock {
            match change {
                StockChange::Decremented { product_id, from, to } => {
                    tracing::debug!(%product_id, from, to, "stock decremented");
                }
                StockChange::Skipped { product_id } => {
                    tracing::warn!(%product_id, order_id = %order.id, "product missing; stock not decremented");
                }
            }
        }
        if paid_at > pending.expires_at {
            tracing::warn!(
                txid = %pending.txid,
                expires_at = %pending.expires_at,
                %paid_at,
                "payment confirmed after the charge expired"
            );
        }
        tracing::info!(
            order_id = %order.id,
            txid = %pending.txid,
            total = order.total_amount,
            "order materialized"
        );

        self.notify(&order).await;
        Ok(Materialization::Created(order))
    }

    /// Resolve a lost race or a replay: the order is either visible now or
    /// there is nothing left to do.
    async fn settled(&self, intent: &PendingPayment) -> Result<Materialization, StoreError> {
        match self.ledger.find_by_txid(intent.user_id, &intent.txid).await? {
            Some(order) => Ok(Materialization::AlreadyMaterialized(order)),
            None => {
                tracing::debug!(txid = %intent.txid, "no pending payment to confirm");
                Ok(Materialization::NothingToDo)
            }
        }
    }

    async fn notify(&self, order: &Order) {
        let customer = match self.ledger.customer(order.user_id).await {
            Ok(customer) => customer,
            Err(err) => {
                tracing::warn!(error = %err, user_id = %order.user_id, "customer lookup failed");
                None
            }
        };
        if let Err(err) = self.notifier.order_confirmed(order, customer.as_ref()).await {
            tracing::error!(error = %err, order_id = %order.id, "order notification failed");
        }
    }
}
