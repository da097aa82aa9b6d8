//! In-process store used by tests and local experiments without PostgreSQL.
//!
//! A single async mutex guards all state, so commits are serialized and
//! trivially atomic.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    models::{Coupon, Order, PaymentStatus, PendingPayment, Product},
    payments::store::{
        CatalogStore, CommitOutcome, Confirmation, Customer, NewPendingPayment, OrderLedger,
        PendingPaymentStore, StockChange, StoreError,
    },
};

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    products: HashMap<Uuid, Product>,
    coupons: HashMap<String, Coupon>,
    customers: HashMap<Uuid, Customer>,
    pending: HashMap<Uuid, PendingPayment>,
    orders: Vec<Order>,
    fail_next_commit: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_product(&self, product: Product) {
        self.inner.lock().await.products.insert(product.id, product);
    }

    pub async fn add_coupon(&self, coupon: Coupon) {
        self.inner
            .lock()
            .await
            .coupons
            .insert(coupon.code.clone(), coupon);
    }

    pub async fn add_customer(&self, user_id: Uuid, customer: Customer) {
        self.inner.lock().await.customers.insert(user_id, customer);
    }

    pub async fn stock(&self, product_id: Uuid) -> Option<i32> {
        self.inner
            .lock()
            .await
            .products
            .get(&product_id)
            .map(|p| p.stock)
    }

    pub async fn orders(&self) -> Vec<Order> {
        self.inner.lock().await.orders.clone()
    }

    pub async fn pending(&self, id: Uuid) -> Option<PendingPayment> {
        self.inner.lock().await.pending.get(&id).cloned()
    }

    pub async fn pending_payments(&self) -> Vec<PendingPayment> {
        self.inner.lock().await.pending.values().cloned().collect()
    }

    /// Make the next `commit` fail before touching anything.
    pub async fn fail_next_commit(&self) {
        self.inner.lock().await.fail_next_commit = true;
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.products.get(id).cloned())
            .collect())
    }

    async fn coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError> {
        Ok(self.inner.lock().await.coupons.get(code).cloned())
    }

    async fn count_orders_with_coupon(&self, code: &str) -> Result<i64, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .orders
            .iter()
            .filter(|o| o.coupon_code.as_deref() == Some(code))
            .count() as i64)
    }
}

#[async_trait]
impl PendingPaymentStore for MemoryStore {
    async fn insert(&self, payment: NewPendingPayment) -> Result<PendingPayment, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.pending.values().any(|p| p.txid == payment.txid) {
            return Err(StoreError::Unavailable(format!(
                "duplicate txid {}",
                payment.txid
            )));
        }
        let now = Utc::now();
        let record = PendingPayment {
            id: Uuid::new_v4(),
            user_id: payment.user_id,
            items: payment.items,
            total_amount: payment.total_amount,
            address: payment.address,
            txid: payment.txid,
            pix_code: payment.pix_code,
            qr_image_url: payment.qr_image_url,
            status: PaymentStatus::Pending,
            coupon_code: payment.coupon_code,
            discount_amount: payment.discount_amount,
            expires_at: payment.expires_at,
            created_at: now,
            updated_at: now,
        };
        inner.pending.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_for_owner(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<PendingPayment>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .pending
            .get(&id)
            .filter(|p| p.user_id == user_id)
            .cloned())
    }

    async fn find_pending_by_txid(
        &self,
        txid: &str,
    ) -> Result<Option<PendingPayment>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .pending
            .values()
            .find(|p| p.txid == txid && p.status == PaymentStatus::Pending)
            .cloned())
    }
}

#[async_trait]
impl OrderLedger for MemoryStore {
    async fn find_by_txid(&self, user_id: Uuid, txid: &str) -> Result<Option<Order>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .orders
            .iter()
            .find(|o| o.user_id == user_id && o.payment.txid == txid)
            .cloned())
    }

    async fn commit(&self, confirmation: Confirmation) -> Result<CommitOutcome, StoreError> {
        let mut inner = self.inner.lock().await;
        if std::mem::take(&mut inner.fail_next_commit) {
            return Err(StoreError::Unavailable("injected commit failure".into()));
        }

        let still_pending = inner
            .pending
            .get(&confirmation.pending_id)
            .is_some_and(|p| p.status == PaymentStatus::Pending);
        let already_ordered = inner
            .orders
            .iter()
            .any(|o| o.payment.txid == confirmation.txid);
        if !still_pending || already_ordered {
            return Ok(CommitOutcome::Superseded);
        }

        let now = Utc::now();
        if let Some(pending) = inner.pending.get_mut(&confirmation.pending_id) {
            pending.status = PaymentStatus::Paid;
            pending.updated_at = now;
        }

        let order = confirmation.to_order(now);
        let demand = confirmation.stock_demand();
        let mut stock = Vec::with_capacity(demand.len());
        for (product_id, quantity) in demand {
            match inner.products.get_mut(&product_id) {
                Some(product) => {
                    let from = product.stock;
                    product.stock = from.saturating_sub(quantity).max(0);
                    stock.push(StockChange::Decremented {
                        product_id,
                        from,
                        to: product.stock,
                    });
                }
                None => stock.push(StockChange::Skipped { product_id }),
            }
        }
        inner.orders.push(order.clone());

        Ok(CommitOutcome::Created { order, stock })
    }

    async fn customer(&self, user_id: Uuid) -> Result<Option<Customer>, StoreError> {
        Ok(self.inner.lock().await.customers.get(&user_id).cloned())
    }
}
