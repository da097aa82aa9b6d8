use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Coupon;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateCouponRequest {
    pub code: String,
}

/// `value` is a whole percent for `percentage`, centavos for `fixed`.
/// `expires_at` accepts `YYYY-MM-DD` (end of that day, UTC) or RFC 3339.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCouponRequest {
    pub code: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: i64,
    pub expires_at: String,
    pub usage_limit: Option<i32>,
    pub active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateCouponRequest {
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub value: Option<i64>,
    pub expires_at: Option<String>,
    pub usage_limit: Option<i32>,
    pub active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CouponList {
    #[schema(value_type = Vec<Coupon>)]
    pub items: Vec<Coupon>,
}
