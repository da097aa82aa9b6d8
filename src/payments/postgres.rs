use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QuerySelect, Set, SqlErr, TransactionTrait,
    sea_query::{Expr, LockType},
};
use uuid::Uuid;

use crate::{
    entity::{
        Coupons, Orders, PendingPayments, Products, Users, coupons, orders, pending_payments,
        products,
    },
    models::{
        Coupon, CouponType, LineItem, Order, OrderStatus, PaymentRecord, PaymentStatus,
        PendingPayment, Product,
    },
    payments::store::{
        CatalogStore, CommitOutcome, Confirmation, Customer, NewPendingPayment, OrderLedger,
        PendingPaymentStore, StockChange, StoreError,
    },
};

/// sea-orm backed store over the `products`, `coupons`, `pending_payments`
/// and `orders` tables.
#[derive(Clone)]
pub struct PgStore {
    conn: DatabaseConnection,
}

impl PgStore {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>, StoreError> {
        let rows = Products::find()
            .filter(products::Column::Id.is_in(ids.iter().copied()))
            .all(&self.conn)
            .await?;
        Ok(rows.into_iter().map(product_from_entity).collect())
    }

    async fn coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError> {
        Coupons::find()
            .filter(coupons::Column::Code.eq(code))
            .one(&self.conn)
            .await?
            .map(coupon_from_entity)
            .transpose()
    }

    async fn count_orders_with_coupon(&self, code: &str) -> Result<i64, StoreError> {
        let count = Orders::find()
            .filter(orders::Column::CouponCode.eq(code))
            .count(&self.conn)
            .await?;
        Ok(count as i64)
    }
}

#[async_trait]
impl PendingPaymentStore for PgStore {
    async fn insert(&self, payment: NewPendingPayment) -> Result<PendingPayment, StoreError> {
        let now = Utc::now();
        let items = to_json(&payment.items)?;
        let active = pending_payments::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(payment.user_id),
            items: Set(items),
            total_amount: Set(payment.total_amount),
            address: Set(payment.address),
            payment_txid: Set(payment.txid),
            pix_code: Set(payment.pix_code),
            qr_image_url: Set(payment.qr_image_url),
            status: Set(PaymentStatus::Pending.as_str().to_string()),
            coupon_code: Set(payment.coupon_code),
            discount_amount: Set(payment.discount_amount),
            expires_at: Set(payment.expires_at.into()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        let model = active.insert(&self.conn).await?;
        pending_from_entity(model)
    }

    async fn find_for_owner(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<PendingPayment>, StoreError> {
        PendingPayments::find_by_id(id)
            .filter(pending_payments::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await?
            .map(pending_from_entity)
            .transpose()
    }

    async fn find_pending_by_txid(
        &self,
        txid: &str,
    ) -> Result<Option<PendingPayment>, StoreError> {
        PendingPayments::find()
            .filter(pending_payments::Column::PaymentTxid.eq(txid))
            .filter(pending_payments::Column::Status.eq(PaymentStatus::Pending.as_str()))
            .one(&self.conn)
            .await?
            .map(pending_from_entity)
            .transpose()
    }
}

#[async_trait]
impl OrderLedger for PgStore {
    async fn find_by_txid(&self, user_id: Uuid, txid: &str) -> Result<Option<Order>, StoreError> {
        Orders::find()
            .filter(orders::Column::UserId.eq(user_id))
            .filter(orders::Column::PaymentTxid.eq(txid))
            .one(&self.conn)
            .await?
            .map(order_from_entity)
            .transpose()
    }

    async fn commit(&self, confirmation: Confirmation) -> Result<CommitOutcome, StoreError> {
        let now = Utc::now();
        let txn = self.conn.begin().await?;

        let flipped = PendingPayments::update_many()
            .col_expr(
                pending_payments::Column::Status,
                Expr::value(PaymentStatus::Paid.as_str()),
            )
            .col_expr(
                pending_payments::Column::UpdatedAt,
                Expr::value(now.fixed_offset()),
            )
            .filter(pending_payments::Column::Id.eq(confirmation.pending_id))
            .filter(pending_payments::Column::Status.eq(PaymentStatus::Pending.as_str()))
            .exec(&txn)
            .await?;
        if flipped.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(CommitOutcome::Superseded);
        }

        let order = confirmation.to_order(now);
        match order_active_model(&order, now)?.insert(&txn).await {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                txn.rollback().await?;
                return Ok(CommitOutcome::Superseded);
            }
            Err(err) => return Err(err.into()),
        }

        let demand = confirmation.stock_demand();
        let mut stock = Vec::with_capacity(demand.len());
        for (product_id, quantity) in demand {
            let product = Products::find_by_id(product_id)
                .lock(LockType::Update)
                .one(&txn)
                .await?;
            let Some(product) = product else {
                stock.push(StockChange::Skipped { product_id });
                continue;
            };
            let from = product.stock;
            let to = from.saturating_sub(quantity).max(0);
            let mut active: products::ActiveModel = product.into();
            active.stock = Set(to);
            active.update(&txn).await?;
            stock.push(StockChange::Decremented {
                product_id,
                from,
                to,
            });
        }

        txn.commit().await?;
        Ok(CommitOutcome::Created { order, stock })
    }

    async fn customer(&self, user_id: Uuid) -> Result<Option<Customer>, StoreError> {
        Ok(Users::find_by_id(user_id)
            .one(&self.conn)
            .await?
            .map(|user| Customer {
                name: user.name,
                email: user.email,
            }))
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn to_json(items: &[LineItem]) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(items).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn items_from_json(value: serde_json::Value) -> Result<Vec<LineItem>, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Corrupt(format!("line items: {e}")))
}

fn order_active_model(
    order: &Order,
    now: chrono::DateTime<Utc>,
) -> Result<orders::ActiveModel, StoreError> {
    Ok(orders::ActiveModel {
        id: Set(order.id),
        user_id: Set(order.user_id),
        items: Set(to_json(&order.items)?),
        total_amount: Set(order.total_amount),
        address: Set(order.address.clone()),
        status: Set(order.status.as_str().to_string()),
        payment_txid: Set(order.payment.txid.clone()),
        payment_method: Set(order.payment.method.clone()),
        payment_status: Set(order.payment.status.clone()),
        paid_at: Set(order.payment.paid_at.into()),
        coupon_code: Set(order.coupon_code.clone()),
        discount_amount: Set(order.discount_amount),
        delivery_estimate: Set(order.delivery_estimate.clone()),
        created_at: Set(order.created_at.into()),
        payment_confirmed_at: Set(order.payment_confirmed_at.into()),
        updated_at: Set(now.into()),
    })
}

pub fn product_from_entity(model: products::Model) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        stock: model.stock,
        image_url: model.image_url,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub fn coupon_from_entity(model: coupons::Model) -> Result<Coupon, StoreError> {
    let kind = CouponType::parse(&model.kind)
        .ok_or_else(|| StoreError::Corrupt(format!("coupon type {:?}", model.kind)))?;
    Ok(Coupon {
        id: model.id,
        code: model.code,
        kind,
        value: model.value,
        active: model.active,
        expires_at: model.expires_at.with_timezone(&Utc),
        usage_limit: model.usage_limit,
        created_at: model.created_at.with_timezone(&Utc),
    })
}

pub fn pending_from_entity(model: pending_payments::Model) -> Result<PendingPayment, StoreError> {
    let status = PaymentStatus::parse(&model.status)
        .ok_or_else(|| StoreError::Corrupt(format!("payment status {:?}", model.status)))?;
    Ok(PendingPayment {
        id: model.id,
        user_id: model.user_id,
        items: items_from_json(model.items)?,
        total_amount: model.total_amount,
        address: model.address,
        txid: model.payment_txid,
        pix_code: model.pix_code,
        qr_image_url: model.qr_image_url,
        status,
        coupon_code: model.coupon_code,
        discount_amount: model.discount_amount,
        expires_at: model.expires_at.with_timezone(&Utc),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

pub fn order_from_entity(model: orders::Model) -> Result<Order, StoreError> {
    Ok(Order {
        id: model.id,
        user_id: model.user_id,
        items: items_from_json(model.items)?,
        total_amount: model.total_amount,
        address: model.address,
        status: OrderStatus::from(model.status.as_str()),
        payment: PaymentRecord {
            txid: model.payment_txid,
            method: model.payment_method,
            status: model.payment_status,
            paid_at: model.paid_at.with_timezone(&Utc),
        },
        coupon_code: model.coupon_code,
        discount_amount: model.discount_amount,
        delivery_estimate: model.delivery_estimate,
        created_at: model.created_at.with_timezone(&Utc),
        payment_confirmed_at: model.payment_confirmed_at.with_timezone(&Utc),
    })
}
