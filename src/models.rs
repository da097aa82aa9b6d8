use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    #[schema(value_type = Option<Object>)]
    pub address: Option<Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub stock: i32,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Favorite {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A storefront setting edited from the admin panel (banner text, colors, images).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SiteSetting {
    pub key: String,
    pub value: String,
    /// `text` unless the admin panel stored something else, such as `image`.
    #[serde(rename = "type")]
    pub kind: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CouponType {
    Percentage,
    Fixed,
}

impl CouponType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CouponType::Percentage => "percentage",
            CouponType::Fixed => "fixed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "percentage" => Some(CouponType::Percentage),
            "fixed" => Some(CouponType::Fixed),
            _ => None,
        }
    }
}

/// `value` is a whole percent for percentage coupons and centavos for fixed ones.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    #[serde(rename = "type")]
    pub kind: CouponType,
    pub value: i64,
    pub active: bool,
    pub expires_at: DateTime<Utc>,
    pub usage_limit: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Snapshot of one purchased product, frozen at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LineItem {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: i64,
}

impl LineItem {
    pub fn subtotal(&self) -> i64 {
        self.unit_price.saturating_mul(i64::from(self.quantity))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PendingPayment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<LineItem>,
    pub total_amount: i64,
    #[schema(value_type = Option<Object>)]
    pub address: Option<Value>,
    pub txid: String,
    pub pix_code: Option<String>,
    pub qr_image_url: Option<String>,
    pub status: PaymentStatus,
    pub coupon_code: Option<String>,
    pub discount_amount: Option<i64>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fulfilment stage of an order. Unknown stored values read back as `Outros`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    PedidoFeito,
    EmSeparacao,
    Enviado,
    Entregue,
    Outros,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PedidoFeito => "pedido feito",
            OrderStatus::EmSeparacao => "em separacao",
            OrderStatus::Enviado => "enviado",
            OrderStatus::Entregue => "entregue",
            OrderStatus::Outros => "outros",
        }
    }

    /// Position in the fulfilment sequence; `None` for the catch-all.
    pub fn stage(&self) -> Option<u8> {
        match self {
            OrderStatus::PedidoFeito => Some(0),
            OrderStatus::EmSeparacao => Some(1),
            OrderStatus::Enviado => Some(2),
            OrderStatus::Entregue => Some(3),
            OrderStatus::Outros => None,
        }
    }

    pub fn can_move_to(&self, next: OrderStatus) -> bool {
        match (self.stage(), next.stage()) {
            (Some(current), Some(next)) => next >= current,
            _ => true,
        }
    }
}

impl From<&str> for OrderStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "pedido feito" => OrderStatus::PedidoFeito,
            "em separacao" | "em separação" => OrderStatus::EmSeparacao,
            "enviado" => OrderStatus::Enviado,
            "entregue" => OrderStatus::Entregue,
            _ => OrderStatus::Outros,
        }
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        OrderStatus::from(value.as_str())
    }
}

impl From<OrderStatus> for String {
    fn from(value: OrderStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaymentRecord {
    pub txid: String,
    pub method: String,
    pub status: String,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<LineItem>,
    pub total_amount: i64,
    #[schema(value_type = Option<Object>)]
    pub address: Option<Value>,
    #[schema(value_type = String, example = "pedido feito")]
    pub status: OrderStatus,
    pub payment: PaymentRecord,
    pub coupon_code: Option<String>,
    pub discount_amount: Option<i64>,
    pub delivery_estimate: Option<String>,
    pub created_at: DateTime<Utc>,
    pub payment_confirmed_at: DateTime<Utc>,
}
