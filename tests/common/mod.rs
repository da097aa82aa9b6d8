#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use hypex_storefront_api::{
    models::{Coupon, CouponType, Order, Product},
    payments::{
        PixCheckout,
        gateway::{ChargeState, ChargeStatus, GatewayError, PixCharge, PixGateway},
        memory::MemoryStore,
        notifier::{NotifyError, OrderNotifier},
        store::Customer,
    },
};

/// What the fake provider answers for a txid.
#[derive(Clone)]
pub enum Scripted {
    Status(ChargeStatus),
    Unreachable,
}

#[derive(Default)]
pub struct FakeGateway {
    next: AtomicUsize,
    statuses: Mutex<HashMap<String, Scripted>>,
    pub charges: Mutex<Vec<(i64, String)>>,
}

impl FakeGateway {
    pub async fn script(&self, txid: &str, answer: Scripted) {
        self.statuses.lock().await.insert(txid.to_string(), answer);
    }

    pub async fn mark_paid(&self, txid: &str, amount: i64, paid_at: DateTime<Utc>) {
        self.script(
            txid,
            Scripted::Status(ChargeStatus {
                state: ChargeState::Paid,
                paid_at: Some(paid_at),
                amount: Some(amount),
            }),
        )
        .await;
    }
}

#[async_trait]
impl PixGateway for FakeGateway {
    async fn create_charge(
        &self,
        amount: i64,
        description: &str,
        _metadata: &Value,
    ) -> Result<PixCharge, GatewayError> {
        if amount <= 0 {
            return Err(GatewayError::InvalidAmount);
        }
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        self.charges
            .lock()
            .await
            .push((amount, description.to_string()));
        Ok(PixCharge {
            txid: format!("hypextx{n:026}"),
            pix_code: Some(format!("00020126-fake-{n}")),
            qr_image_url: None,
            expires_at: Utc::now() + Duration::hours(1),
        })
    }

    async fn charge_status(&self, txid: &str) -> Result<ChargeStatus, GatewayError> {
        match self.statuses.lock().await.get(txid).cloned() {
            Some(Scripted::Status(status)) => Ok(status),
            Some(Scripted::Unreachable) => Err(GatewayError::Timeout),
            None => Ok(ChargeStatus::pending()),
        }
    }
}

#[derive(Default)]
pub struct CountingNotifier {
    pub sent: Mutex<Vec<(Uuid, Option<Customer>)>>,
    pub fail: bool,
}

impl CountingNotifier {
    pub async fn count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

#[async_trait]
impl OrderNotifier for CountingNotifier {
    async fn order_confirmed(
        &self,
        order: &Order,
        customer: Option<&Customer>,
    ) -> Result<(), NotifyError> {
        self.sent.lock().await.push((order.id, customer.cloned()));
        if self.fail {
            return Err(NotifyError::Transport("smtp down".into()));
        }
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<FakeGateway>,
    pub notifier: Arc<CountingNotifier>,
    pub pix: PixCheckout,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(None, CountingNotifier::default())
    }

    pub fn with_secret(secret: &str) -> Self {
        Self::build(Some(secret.to_string()), CountingNotifier::default())
    }

    pub fn with_failing_notifier() -> Self {
        Self::build(
            None,
            CountingNotifier {
                fail: true,
                ..Default::default()
            },
        )
    }

    fn build(secret: Option<String>, notifier: CountingNotifier) -> Self {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(FakeGateway::default());
        let notifier = Arc::new(notifier);
        let pix = PixCheckout::new(store.clone(), gateway.clone(), notifier.clone(), secret);
        Self {
            store,
            gateway,
            notifier,
            pix,
        }
    }
}

pub fn product(name: &str, price: i64, stock: i32) -> Product {
    Product {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: None,
        price,
        stock,
        image_url: None,
        created_at: Utc::now(),
    }
}

pub fn coupon(code: &str, kind: CouponType, value: i64) -> Coupon {
    Coupon {
        id: Uuid::new_v4(),
        code: code.to_string(),
        kind,
        value,
        active: true,
        expires_at: Utc::now() + Duration::days(30),
        usage_limit: None,
        created_at: Utc::now(),
    }
}
