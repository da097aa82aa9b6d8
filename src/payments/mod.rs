//! PIX checkout: charge creation, pending intents and their reconciliation
//! into orders.

use std::sync::Arc;

pub mod checkout;
pub mod confirmation;
pub mod efi;
pub mod gateway;
pub mod materializer;
pub mod memory;
pub mod notifier;
pub mod postgres;
pub mod store;
pub mod webhook;

use gateway::PixGateway;
use materializer::OrderMaterializer;
use notifier::OrderNotifier;
use store::{CatalogStore, OrderLedger, PendingPaymentStore};

/// Collaborators shared by the checkout, webhook and poll handlers.
pub struct PixCheckout {
    catalog: Arc<dyn CatalogStore>,
    pending: Arc<dyn PendingPaymentStore>,
    ledger: Arc<dyn OrderLedger>,
    gateway: Arc<dyn PixGateway>,
    materializer: OrderMaterializer,
    webhook_secret: Option<String>,
}

impl PixCheckout {
    /// Build from one store implementing every store trait.
    pub fn new<S>(
        store: Arc<S>,
        gateway: Arc<dyn PixGateway>,
        notifier: Arc<dyn OrderNotifier>,
        webhook_secret: Option<String>,
    ) -> Self
    where
        S: CatalogStore + PendingPaymentStore + OrderLedger + 'static,
    {
        let pending: Arc<dyn PendingPaymentStore> = store.clone();
        let ledger: Arc<dyn OrderLedger> = store.clone();
        Self {
            catalog: store,
            materializer: OrderMaterializer::new(pending.clone(), ledger.clone(), notifier),
            pending,
            ledger,
            gateway,
            webhook_secret,
        }
    }

    pub fn materializer(&self) -> &OrderMaterializer {
        &self.materializer
    }
}
