use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Coupon, LineItem, Order, OrderStatus, PaymentRecord, PendingPayment, Product,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("stored record is malformed: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Everything needed to persist a payment intent right after the charge exists.
#[derive(Debug, Clone)]
pub struct NewPendingPayment {
    pub user_id: Uuid,
    pub items: Vec<LineItem>,
    pub total_amount: i64,
    pub address: Option<Value>,
    pub txid: String,
    pub pix_code: Option<String>,
    pub qr_image_url: Option<String>,
    pub coupon_code: Option<String>,
    pub discount_amount: Option<i64>,
    pub expires_at: DateTime<Utc>,
}

/// A confirmed payment about to become an order.
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub pending_id: Uuid,
    pub user_id: Uuid,
    pub txid: String,
    pub items: Vec<LineItem>,
    pub total_amount: i64,
    pub address: Option<Value>,
    pub coupon_code: Option<String>,
    pub discount_amount: Option<i64>,
    pub paid_at: DateTime<Utc>,
}

impl Confirmation {
    pub fn new(pending: &PendingPayment, paid_at: DateTime<Utc>) -> Self {
        Self {
            pending_id: pending.id,
            user_id: pending.user_id,
            txid: pending.txid.clone(),
            items: pending.items.clone(),
            total_amount: pending.total_amount,
            address: pending.address.clone(),
            coupon_code: pending.coupon_code.clone(),
            discount_amount: pending.discount_amount,
            paid_at,
        }
    }

    /// Units to take per product, merged across repeated lines and ordered by
    /// product id. Row locks are taken in this order.
    pub fn stock_demand(&self) -> BTreeMap<Uuid, i32> {
        let mut demand = BTreeMap::new();
        for item in &self.items {
            let units: &mut i32 = demand.entry(item.product_id).or_default();
            *units = units.saturating_add(item.quantity);
        }
        demand
    }

    /// The order row this confirmation produces.
    pub fn to_order(&self, now: DateTime<Utc>) -> Order {
        Order {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            items: self.items.clone(),
            total_amount: self.total_amount,
            address: self.address.clone(),
            status: OrderStatus::PedidoFeito,
            payment: PaymentRecord {
                txid: self.txid.clone(),
                method: "pix".to_string(),
                status: "paid".to_string(),
                paid_at: self.paid_at,
            },
            coupon_code: self.coupon_code.clone(),
            discount_amount: self.discount_amount,
            delivery_estimate: None,
            created_at: now,
            payment_confirmed_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockChange {
    Decremented {
        product_id: Uuid,
        from: i32,
        to: i32,
    },
    /// The product no longer exists; nothing was decremented.
    Skipped { product_id: Uuid },
}

#[derive(Debug, Clone)]
pub enum CommitOutcome {
    Created {
        order: Order,
        stock: Vec<StockChange>,
    },
    /// Another confirmation got there first; nothing was written.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    pub name: String,
    pub email: String,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>, StoreError>;

    async fn coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError>;

    async fn count_orders_with_coupon(&self, code: &str) -> Result<i64, StoreError>;
}

#[async_trait]
pub trait PendingPaymentStore: Send + Sync {
    async fn insert(&self, payment: NewPendingPayment) -> Result<PendingPayment, StoreError>;

    async fn find_for_owner(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<PendingPayment>, StoreError>;

    /// Only returns the record while it is still `pending`.
    async fn find_pending_by_txid(&self, txid: &str)
    -> Result<Option<PendingPayment>, StoreError>;
}

#[async_trait]
pub trait OrderLedger: Send + Sync {
    async fn find_by_txid(&self, user_id: Uuid, txid: &str) -> Result<Option<Order>, StoreError>;

    /// Atomically flip the pending payment to paid, insert the order and
    /// decrement stock. Either all of it is applied or none of it.
    async fn commit(&self, confirmation: Confirmation) -> Result<CommitOutcome, StoreError>;

    async fn customer(&self, user_id: Uuid) -> Result<Option<Customer>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: Uuid, quantity: i32) -> LineItem {
        LineItem {
            product_id,
            name: "Item".into(),
            quantity,
            unit_price: 1000,
        }
    }

    #[test]
    fn stock_demand_merges_lines_in_id_order() {
        let mut ids = [Uuid::new_v4(), Uuid::new_v4()];
        ids.sort();
        let [low, high] = ids;
        let confirmation = Confirmation {
            pending_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            txid: "tx".into(),
            items: vec![line(high, 2), line(low, 1), line(high, i32::MAX)],
            total_amount: 3000,
            address: None,
            coupon_code: None,
            discount_amount: None,
            paid_at: Utc::now(),
        };

        let demand: Vec<_> = confirmation.stock_demand().into_iter().collect();
        assert_eq!(demand, vec![(low, 1), (high, i32::MAX)]);
    }
}
