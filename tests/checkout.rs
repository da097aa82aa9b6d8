mod common;

use serde_json::json;
use uuid::Uuid;

use common::{Harness, coupon, product};
use hypex_storefront_api::{
    dto::orders::CheckoutRequest, error::AppError, models::CouponType,
};

fn request(value: serde_json::Value) -> CheckoutRequest {
    serde_json::from_value(value).expect("checkout request")
}

#[tokio::test]
async fn percentage_coupon_discounts_the_charge() {
    let h = Harness::new();
    let tee = product("Camiseta", 10000, 10);
    h.store.add_product(tee.clone()).await;
    h.store
        .add_coupon(coupon("HYPE10", CouponType::Percentage, 10))
        .await;
    let user = Uuid::new_v4();

    let response = h
        .pix
        .checkout(
            user,
            request(json!({
                "items": [{ "product_id": tee.id, "checked": true, "quantity": 2 }],
                "address": { "cep": "01001-000" },
                "coupon_code": " hype10 "
            })),
        )
        .await
        .expect("checkout succeeds");

    assert_eq!(response.summary.subtotal, 20000);
    assert_eq!(response.summary.discount, 2000);
    assert_eq!(response.summary.total, 18000);
    assert_eq!(response.payment.amount, 18000);
    assert_eq!(response.payment.status, "pending");
    let applied = response.summary.coupon.expect("coupon applied");
    assert_eq!(applied.code, "HYPE10");

    let charges = h.gateway.charges.lock().await.clone();
    assert_eq!(charges, vec![(18000, "Pedido HYPEX - 1 item(ns)".to_string())]);

    let pending = h
        .store
        .pending(response.pending_payment_id)
        .await
        .expect("pending payment stored");
    assert_eq!(pending.user_id, user);
    assert_eq!(pending.coupon_code.as_deref(), Some("HYPE10"));
    assert_eq!(pending.discount_amount, Some(2000));
    assert!(h.store.orders().await.is_empty());
    // Stock is only taken when the payment is confirmed.
    assert_eq!(h.store.stock(tee.id).await, Some(10));
}

#[tokio::test]
async fn fixed_coupon_covering_everything_is_rejected() {
    let h = Harness::new();
    let cap = product("Boné", 5000, 10);
    h.store.add_product(cap.clone()).await;
    h.store
        .add_coupon(coupon("VALE100", CouponType::Fixed, 10000))
        .await;

    let err = h
        .pix
        .checkout(
            Uuid::new_v4(),
            request(json!({
                "items": [{ "product_id": cap.id, "checked": true }],
                "coupon_code": "VALE100"
            })),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
    assert!(h.gateway.charges.lock().await.is_empty());
}

#[tokio::test]
async fn unchecked_items_are_not_charged() {
    let h = Harness::new();
    let tee = product("Camiseta", 10000, 10);
    let hoodie = product("Moletom", 25000, 10);
    h.store.add_product(tee.clone()).await;
    h.store.add_product(hoodie.clone()).await;

    let response = h
        .pix
        .checkout(
            Uuid::new_v4(),
            request(json!({
                "items": [
                    { "product_id": tee.id, "qty": 1, "checked": true },
                    { "product_id": hoodie.id, "qty": 1, "checked": false }
                ]
            })),
        )
        .await
        .expect("checkout succeeds");

    assert_eq!(response.summary.items_count, 1);
    assert_eq!(response.summary.total, 10000);
}

#[tokio::test]
async fn insufficient_stock_counts_repeated_lines() {
    let h = Harness::new();
    let sock = product("Meia", 1000, 3);
    h.store.add_product(sock.clone()).await;

    let err = h
        .pix
        .checkout(
            Uuid::new_v4(),
            request(json!({
                "items": [
                    { "product_id": sock.id, "checked": true, "quantity": 2 },
                    { "product_id": sock.id, "checked": true, "quantity": 2 }
                ]
            })),
        )
        .await
        .unwrap_err();

    match err {
        AppError::Inventory(message) => assert!(message.contains("Meia"), "{message}"),
        other => panic!("expected inventory error, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_product_is_not_found() {
    let h = Harness::new();
    let err = h
        .pix
        .checkout(
            Uuid::new_v4(),
            request(json!({ "items": [{ "product_id": Uuid::new_v4(), "checked": true }] })),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}

#[tokio::test]
async fn empty_selection_is_rejected() {
    let h = Harness::new();
    let tee = product("Camiseta", 10000, 10);
    h.store.add_product(tee.clone()).await;

    for items in [
        json!([]),
        json!([{ "product_id": tee.id, "checked": false }]),
    ] {
        let err = h
            .pix
            .checkout(Uuid::new_v4(), request(json!({ "items": items })))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
    }
}

#[tokio::test]
async fn unknown_or_exhausted_coupons_are_rejected() {
    let h = Harness::new();
    let tee = product("Camiseta", 10000, 10);
    h.store.add_product(tee.clone()).await;
    let mut limited = coupon("UMAVEZ", CouponType::Fixed, 500);
    limited.usage_limit = Some(1);
    h.store.add_coupon(limited).await;

    let err = h
        .pix
        .checkout(
            Uuid::new_v4(),
            request(json!({ "items": [{ "product_id": tee.id, "checked": true }], "coupon_code": "NOPE" })),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // First use goes through and is confirmed, so the coupon is spent.
    let first = h
        .pix
        .checkout(
            Uuid::new_v4(),
            request(json!({ "items": [{ "product_id": tee.id, "checked": true }], "coupon_code": "umavez" })),
        )
        .await
        .expect("first use");
    let pending = h.store.pending(first.pending_payment_id).await.unwrap();
    h.pix
        .materializer()
        .confirm(&pending, chrono::Utc::now())
        .await
        .expect("confirmed");

    let err = h
        .pix
        .checkout(
            Uuid::new_v4(),
            request(json!({ "items": [{ "product_id": tee.id, "checked": true }], "coupon_code": "UMAVEZ" })),
        )
        .await
        .unwrap_err();
    match err {
        AppError::Validation(message) => assert!(message.contains("usage limit"), "{message}"),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn quantities_past_i32_max_are_out_of_stock() {
    let h = Harness::new();
    let sock = product("Meia", 1000, 3);
    h.store.add_product(sock.clone()).await;

    let err = h
        .pix
        .checkout(
            Uuid::new_v4(),
            request(json!({
                "items": [
                    { "product_id": sock.id, "checked": true, "quantity": 1 },
                    { "product_id": sock.id, "checked": true, "quantity": i32::MAX }
                ]
            })),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Inventory(_)), "got {err:?}");
    assert!(h.gateway.charges.lock().await.is_empty());
    assert!(h.store.pending_payments().await.is_empty());
}

#[tokio::test]
async fn items_without_checked_flag_are_not_selected() {
    let h = Harness::new();
    let tee = product("Camiseta", 10000, 10);
    let cap = product("Boné", 5000, 10);
    h.store.add_product(tee.clone()).await;
    h.store.add_product(cap.clone()).await;

    let err = h
        .pix
        .checkout(
            Uuid::new_v4(),
            request(json!({ "items": [{ "product_id": tee.id, "quantity": 1 }] })),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");

    let response = h
        .pix
        .checkout(
            Uuid::new_v4(),
            request(json!({
                "items": [
                    { "product_id": tee.id, "quantity": 1 },
                    { "product_id": cap.id, "quantity": 1, "checked": true }
                ]
            })),
        )
        .await
        .expect("checkout succeeds");
    assert_eq!(response.summary.items_count, 1);
    assert_eq!(response.summary.total, 5000);
}
