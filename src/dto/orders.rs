use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{CouponType, Order, OrderStatus};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CheckoutItem {
    pub product_id: Uuid,
    /// Defaults to 1.
    #[serde(default, alias = "qty")]
    pub quantity: Option<i32>,
    /// Only checked items are paid for.
    #[serde(default)]
    pub checked: bool,
}

impl CheckoutItem {
    pub fn is_selected(&self) -> bool {
        self.checked
    }

    pub fn quantity(&self) -> i32 {
        self.quantity.unwrap_or(1)
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
    #[schema(value_type = Option<Object>)]
    pub address: Option<Value>,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckoutPayment {
    pub txid: String,
    pub pix_code: Option<String>,
    pub qr_image_url: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub amount: i64,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AppliedCoupon {
    pub code: String,
    #[serde(rename = "type")]
    pub kind: CouponType,
    pub value: i64,
    pub discount_amount: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckoutSummary {
    pub items_count: usize,
    pub subtotal: i64,
    pub discount: i64,
    pub total: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon: Option<AppliedCoupon>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub pending_payment_id: Uuid,
    pub payment: CheckoutPayment,
    pub summary: CheckoutSummary,
}

/// Answer of the pending-payment poll.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentStatusView {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub order_status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Set when this poll is the one that created the order.
    #[serde(skip)]
    pub created: bool,
}

impl PaymentStatusView {
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            paid_at: None,
            order_id: None,
            order_status: None,
            detail: None,
            created: false,
        }
    }

    pub fn paid(order: &Order) -> Self {
        Self {
            paid_at: Some(order.payment.paid_at),
            order_id: Some(order.id),
            order_status: Some(order.status),
            ..Self::status("paid")
        }
    }
}

/// Body returned to the PIX provider; anything but 2xx makes it redeliver.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WebhookAck {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
    #[serde(skip)]
    pub created: bool,
}

impl WebhookAck {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: Some(message.into()),
            order_id: None,
            created: false,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct OrderList {
    #[schema(value_type = Vec<Order>)]
    pub items: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminOrder {
    #[serde(flatten)]
    pub order: Order,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct AdminOrderList {
    #[schema(value_type = Vec<AdminOrder>)]
    pub items: Vec<AdminOrder>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
    pub delivery_estimate: Option<String>,
}
