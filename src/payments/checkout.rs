use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::{
    dto::orders::{
        AppliedCoupon, CheckoutPayment, CheckoutRequest, CheckoutResponse, CheckoutSummary,
    },
    error::{AppError, AppResult},
    models::{Coupon, CouponType, LineItem, Product},
    payments::{PixCheckout, store::NewPendingPayment},
};

/// Upper-cased, trimmed form under which coupons are stored.
pub fn normalize_coupon_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Discount in centavos, never more than the subtotal. Percentages round down.
pub fn discount_for(kind: CouponType, value: i64, subtotal: i64) -> i64 {
    let discount = match kind {
        CouponType::Fixed => value,
        CouponType::Percentage => subtotal * value / 100,
    };
    discount.clamp(0, subtotal.max(0))
}

pub fn apply_discount(subtotal: i64, discount: i64) -> i64 {
    (subtotal - discount).max(0)
}

/// `usage_limit` of `None` or `0` means unlimited; usage counts orders carrying the code.
pub fn ensure_coupon_usable(coupon: &Coupon, used: i64, now: DateTime<Utc>) -> AppResult<()> {
    if !coupon.active {
        return Err(AppError::Validation("Coupon is inactive".into()));
    }
    if coupon.expires_at < now {
        return Err(AppError::Validation("Coupon has expired".into()));
    }
    if let Some(limit) = coupon.usage_limit.filter(|limit| *limit > 0) {
        if used >= i64::from(limit) {
            return Err(AppError::Validation(
                "Coupon usage limit has been reached".into(),
            ));
        }
    }
    Ok(())
}

impl PixCheckout {
    /// Price the selection, create the PIX charge and remember the intent.
    /// No order exists until the payment is confirmed.
    pub async fn checkout(
        &self,
        user_id: Uuid,
        request: CheckoutRequest,
    ) -> AppResult<CheckoutResponse> {
        let selected: Vec<_> = request.items.iter().filter(|i| i.is_selected()).collect();
        if selected.is_empty() {
            return Err(AppError::Validation(
                "Select at least one item to pay for".into(),
            ));
        }
        if selected.iter().any(|i| i.quantity() <= 0) {
            return Err(AppError::Validation(
                "Item quantity must be greater than zero".into(),
            ));
        }

        let mut ids: Vec<Uuid> = selected.iter().map(|i| i.product_id).collect();
        ids.sort();
        ids.dedup();
        let products: HashMap<Uuid, Product> = self
            .catalog
            .products_by_ids(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut items = Vec::with_capacity(selected.len());
        let mut requested: HashMap<Uuid, i64> = HashMap::new();
        for item in &selected {
            let Some(product) = products.get(&item.product_id) else {
                tracing::debug!(product_id = %item.product_id, "checkout references unknown product");
                return Err(AppError::NotFound);
            };
            let wanted = requested.entry(product.id).or_insert(0);
            *wanted = wanted.saturating_add(i64::from(item.quantity()));
            if i64::from(product.stock) < *wanted {
                return Err(AppError::Inventory(format!(
                    "Product \"{}\" does not have enough stock. Available: {}, requested: {}",
                    product.name, product.stock, wanted
                )));
            }
            items.push(LineItem {
                product_id: product.id,
                name: product.name.clone(),
                quantity: item.quantity(),
                unit_price: product.price,
            });
        }

        let subtotal: i64 = items.iter().map(LineItem::subtotal).sum();
        let coupon = match request
            .coupon_code
            .as_deref()
            .map(normalize_coupon_code)
            .filter(|code| !code.is_empty())
        {
            Some(code) => Some(self.usable_coupon(&code, subtotal).await?),
            None => None,
        };
        let discount = coupon.as_ref().map_or(0, |c| c.discount_amount);
        let total = apply_discount(subtotal, discount);
        if total <= 0 {
            return Err(AppError::Validation(
                "Order total must be greater than zero to pay with PIX".into(),
            ));
        }

        let description = format!("Pedido HYPEX - {} item(ns)", items.len());
        let metadata = json!({
            "user_id": user_id,
            "items_count": items.len(),
            "coupon_code": coupon.as_ref().map(|c| c.code.clone()),
        });
        let charge = self
            .gateway
            .create_charge(total, &description, &metadata)
            .await?;

        let pending = self
            .pending
            .insert(NewPendingPayment {
                user_id,
                items,
                total_amount: total,
                address: request.address,
                txid: charge.txid.clone(),
                pix_code: charge.pix_code.clone(),
                qr_image_url: charge.qr_image_url.clone(),
                coupon_code: coupon.as_ref().map(|c| c.code.clone()),
                discount_amount: coupon.as_ref().map(|c| c.discount_amount),
                expires_at: charge.expires_at,
            })
            .await?;
        tracing::info!(
            pending_payment_id = %pending.id,
            txid = %pending.txid,
            total,
            "pending payment created"
        );

        Ok(CheckoutResponse {
            pending_payment_id: pending.id,
            payment: CheckoutPayment {
                txid: pending.txid,
                pix_code: pending.pix_code,
                qr_image_url: pending.qr_image_url,
                expires_at: pending.expires_at,
                amount: total,
                status: pending.status.as_str().to_string(),
            },
            summary: CheckoutSummary {
                items_count: pending.items.len(),
                subtotal,
                discount,
                total,
                coupon,
            },
        })
    }

    async fn usable_coupon(&self, code: &str, subtotal: i64) -> AppResult<AppliedCoupon> {
        let coupon = self.catalog.coupon_by_code(code).await?.ok_or_else(|| {
            AppError::Validation("Coupon is invalid, expired or inactive".into())
        })?;
        let used = self.catalog.count_orders_with_coupon(&coupon.code).await?;
        ensure_coupon_usable(&coupon, used, Utc::now())?;
        Ok(AppliedCoupon {
            discount_amount: discount_for(coupon.kind, coupon.value, subtotal),
            code: coupon.code,
            kind: coupon.kind,
            value: coupon.value,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn coupon(limit: Option<i32>) -> Coupon {
        Coupon {
            id: Uuid::new_v4(),
            code: "HYPE10".into(),
            kind: CouponType::Percentage,
            value: 10,
            active: true,
            expires_at: Utc::now() + Duration::days(1),
            usage_limit: limit,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn percentage_discount_rounds_down() {
        assert_eq!(discount_for(CouponType::Percentage, 10, 20000), 2000);
        assert_eq!(discount_for(CouponType::Percentage, 15, 999), 149);
    }

    #[test]
    fn fixed_discount_is_capped_at_subtotal() {
        assert_eq!(discount_for(CouponType::Fixed, 10000, 5000), 5000);
        assert_eq!(apply_discount(5000, 5000), 0);
        assert_eq!(apply_discount(5000, 7000), 0);
    }

    #[test]
    fn zero_usage_limit_means_unlimited() {
        let now = Utc::now();
        assert!(ensure_coupon_usable(&coupon(Some(0)), 500, now).is_ok());
        assert!(ensure_coupon_usable(&coupon(None), 500, now).is_ok());
        assert!(ensure_coupon_usable(&coupon(Some(2)), 1, now).is_ok());
        assert!(ensure_coupon_usable(&coupon(Some(2)), 2, now).is_err());
    }

    #[test]
    fn expired_or_inactive_coupons_are_rejected() {
        let now = Utc::now();
        let mut expired = coupon(None);
        expired.expires_at = now - Duration::minutes(1);
        assert!(ensure_coupon_usable(&expired, 0, now).is_err());

        let mut inactive = coupon(None);
        inactive.active = false;
        assert!(ensure_coupon_usable(&inactive, 0, now).is_err());
    }

    #[test]
    fn coupon_codes_are_normalized() {
        assert_eq!(normalize_coupon_code("  hype10 "), "HYPE10");
    }
}
