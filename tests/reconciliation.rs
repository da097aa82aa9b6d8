mod common;

use std::time::Duration as StdDuration;

use axum::http::{HeaderMap, HeaderValue};
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use common::{Harness, Scripted, product};
use hypex_storefront_api::{
    dto::orders::{CheckoutRequest, CheckoutResponse},
    error::AppError,
    models::{OrderStatus, PaymentStatus},
    payments::{materializer::Materialization, store::Customer},
};

async fn checkout(h: &Harness, user: Uuid, items: serde_json::Value) -> CheckoutResponse {
    let request: CheckoutRequest =
        serde_json::from_value(json!({ "items": items })).expect("request");
    h.pix.checkout(user, request).await.expect("checkout")
}

fn pix_payload(txid: &str) -> serde_json::Value {
    json!({ "pix": [{ "txid": txid, "valor": "50.00", "horario": "2025-03-01T12:00:00-03:00" }] })
}

#[tokio::test]
async fn webhook_creates_exactly_one_order() {
    let h = Harness::new();
    let tee = product("Camiseta", 5000, 5);
    h.store.add_product(tee.clone()).await;
    let user = Uuid::new_v4();
    h.store
        .add_customer(
            user,
            Customer {
                name: "Ana".into(),
                email: "ana@example.com".into(),
            },
        )
        .await;
    let created = checkout(&h, user, json!([{ "product_id": tee.id, "checked": true, "quantity": 2 }])).await;
    let txid = created.payment.txid.clone();

    let ack = h
        .pix
        .handle_webhook(&HeaderMap::new(), &pix_payload(&txid))
        .await
        .expect("webhook accepted");
    assert!(ack.ok);
    assert!(ack.created);
    let order_id = ack.order_id.expect("order id");

    // Redelivery of the same notification is acknowledged without effects.
    let again = h
        .pix
        .handle_webhook(&HeaderMap::new(), &pix_payload(&txid))
        .await
        .expect("redelivery accepted");
    assert!(again.ok);
    assert!(!again.created);

    let orders = h.store.orders().await;
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order.id, order_id);
    assert_eq!(order.status, OrderStatus::PedidoFeito);
    assert_eq!(order.payment.txid, txid);
    assert_eq!(order.payment.method, "pix");
    assert_eq!(order.payment.paid_at.to_rfc3339(), "2025-03-01T15:00:00+00:00");
    assert_eq!(order.total_amount, 10000);

    assert_eq!(h.store.stock(tee.id).await, Some(3));
    let pending = h.store.pending(created.pending_payment_id).await.unwrap();
    assert_eq!(pending.status, PaymentStatus::Paid);

    let sent = h.notifier.sent.lock().await.clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, order_id);
    assert_eq!(sent[0].1.as_ref().map(|c| c.email.as_str()), Some("ana@example.com"));
}

#[tokio::test]
async fn concurrent_confirmations_materialize_once() {
    let h = Harness::new();
    let tee = product("Camiseta", 5000, 10);
    h.store.add_product(tee.clone()).await;
    let user = Uuid::new_v4();
    let created = checkout(&h, user, json!([{ "product_id": tee.id, "checked": true, "quantity": 1 }])).await;
    let pending = h.store.pending(created.pending_payment_id).await.unwrap();
    let paid_at = Utc::now();

    let (a, b) = tokio::join!(
        h.pix.materializer().confirm(&pending, paid_at),
        h.pix.materializer().confirm(&pending, paid_at),
    );
    let outcomes = [a.expect("first"), b.expect("second")];

    let created_count = outcomes
        .iter()
        .filter(|o| matches!(o, Materialization::Created(_)))
        .count();
    assert_eq!(created_count, 1);
    let ids: Vec<_> = outcomes.iter().filter_map(|o| o.order().map(|o| o.id)).collect();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0], ids[1]);

    assert_eq!(h.store.orders().await.len(), 1);
    assert_eq!(h.store.stock(tee.id).await, Some(9));
    assert_eq!(h.notifier.count().await, 1);
}

#[tokio::test]
async fn webhook_then_poll_share_one_order() {
    let h = Harness::new();
    let tee = product("Camiseta", 5000, 10);
    h.store.add_product(tee.clone()).await;
    let user = Uuid::new_v4();
    let created = checkout(&h, user, json!([{ "product_id": tee.id, "checked": true }])).await;
    let txid = created.payment.txid.clone();
    h.gateway.mark_paid(&txid, 5000, Utc::now()).await;

    let webhook = h
        .pix
        .handle_webhook(&HeaderMap::new(), &pix_payload(&txid))
        .await
        .expect("webhook");
    tokio::time::sleep(StdDuration::from_millis(50)).await;
    let view = h
        .pix
        .poll_status(user, created.pending_payment_id)
        .await
        .expect("poll");

    assert_eq!(view.status, "paid");
    assert_eq!(view.order_id, webhook.order_id);
    assert_eq!(view.order_status, Some(OrderStatus::PedidoFeito));
    assert_eq!(h.store.orders().await.len(), 1);
    assert_eq!(h.notifier.count().await, 1);
}

#[tokio::test]
async fn poll_materializes_when_provider_reports_paid() {
    let h = Harness::new();
    let tee = product("Camiseta", 5000, 10);
    h.store.add_product(tee.clone()).await;
    let user = Uuid::new_v4();
    let created = checkout(&h, user, json!([{ "product_id": tee.id, "checked": true }])).await;

    let view = h.pix.poll_status(user, created.pending_payment_id).await.unwrap();
    assert_eq!(view.status, "pending");
    assert!(view.order_id.is_none());

    // A different amount is only logged; the order is still created.
    let paid_at = Utc::now() - Duration::seconds(5);
    h.gateway
        .mark_paid(&created.payment.txid, 4999, paid_at)
        .await;
    let view = h.pix.poll_status(user, created.pending_payment_id).await.unwrap();
    assert_eq!(view.status, "paid");
    assert_eq!(view.paid_at, Some(paid_at));

    let orders = h.store.orders().await;
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].total_amount, 5000);
}

#[tokio::test]
async fn poll_reports_provider_failure_with_stored_status() {
    let h = Harness::new();
    let tee = product("Camiseta", 5000, 10);
    h.store.add_product(tee.clone()).await;
    let user = Uuid::new_v4();
    let created = checkout(&h, user, json!([{ "product_id": tee.id, "checked": true }])).await;
    h.gateway
        .script(&created.payment.txid, Scripted::Unreachable)
        .await;

    let view = h.pix.poll_status(user, created.pending_payment_id).await.unwrap();
    assert_eq!(view.status, "pending");
    assert!(view.detail.is_some());
    assert!(h.store.orders().await.is_empty());
}

#[tokio::test]
async fn poll_is_scoped_to_the_owner() {
    let h = Harness::new();
    let tee = product("Camiseta", 5000, 10);
    h.store.add_product(tee.clone()).await;
    let created = checkout(&h, Uuid::new_v4(), json!([{ "product_id": tee.id, "checked": true }])).await;

    let err = h
        .pix
        .poll_status(Uuid::new_v4(), created.pending_payment_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}

#[tokio::test]
async fn stock_never_goes_below_zero() {
    let h = Harness::new();
    let hoodie = product("Moletom", 20000, 5);
    h.store.add_product(hoodie.clone()).await;
    let first = checkout(&h, Uuid::new_v4(), json!([{ "product_id": hoodie.id, "checked": true, "quantity": 3 }])).await;
    let second = checkout(&h, Uuid::new_v4(), json!([{ "product_id": hoodie.id, "checked": true, "quantity": 3 }])).await;

    for created in [&first, &second] {
        let ack = h
            .pix
            .handle_webhook(&HeaderMap::new(), &json!({ "txid": created.payment.txid }))
            .await
            .unwrap();
        assert!(ack.created);
    }

    // Both orders stand; the second one only had two units left.
    assert_eq!(h.store.orders().await.len(), 2);
    assert_eq!(h.store.stock(hoodie.id).await, Some(0));
}

#[tokio::test]
async fn failed_commit_leaves_payment_pending_for_retry() {
    let h = Harness::new();
    let tee = product("Camiseta", 5000, 4);
    h.store.add_product(tee.clone()).await;
    let created = checkout(&h, Uuid::new_v4(), json!([{ "product_id": tee.id, "checked": true, "quantity": 2 }])).await;
    let txid = created.payment.txid.clone();

    h.store.fail_next_commit().await;
    let err = h
        .pix
        .handle_webhook(&HeaderMap::new(), &pix_payload(&txid))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Store(_)));
    assert!(h.store.orders().await.is_empty());
    assert_eq!(h.store.stock(tee.id).await, Some(4));
    let pending = h.store.pending(created.pending_payment_id).await.unwrap();
    assert_eq!(pending.status, PaymentStatus::Pending);

    let ack = h
        .pix
        .handle_webhook(&HeaderMap::new(), &pix_payload(&txid))
        .await
        .expect("retry succeeds");
    assert!(ack.created);
    assert_eq!(h.store.stock(tee.id).await, Some(2));
}

#[tokio::test]
async fn notifier_failure_does_not_undo_the_order() {
    let h = Harness::with_failing_notifier();
    let tee = product("Camiseta", 5000, 4);
    h.store.add_product(tee.clone()).await;
    let created = checkout(&h, Uuid::new_v4(), json!([{ "product_id": tee.id, "checked": true }])).await;

    let ack = h
        .pix
        .handle_webhook(&HeaderMap::new(), &pix_payload(&created.payment.txid))
        .await
        .expect("webhook succeeds even if mail fails");
    assert!(ack.created);
    assert_eq!(h.store.orders().await.len(), 1);
    assert_eq!(h.notifier.count().await, 1);
}

#[tokio::test]
async fn webhook_signature_is_enforced_when_configured() {
    let h = Harness::with_secret("s3cret");
    let tee = product("Camiseta", 5000, 4);
    h.store.add_product(tee.clone()).await;
    let created = checkout(&h, Uuid::new_v4(), json!([{ "product_id": tee.id, "checked": true }])).await;
    let payload = pix_payload(&created.payment.txid);

    let err = h
        .pix
        .handle_webhook(&HeaderMap::new(), &payload)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let mut wrong = HeaderMap::new();
    wrong.insert("x-efibank-signature", HeaderValue::from_static("nope"));
    assert!(matches!(
        h.pix.handle_webhook(&wrong, &payload).await,
        Err(AppError::Forbidden)
    ));
    assert!(h.store.orders().await.is_empty());

    let mut signed = HeaderMap::new();
    signed.insert("x-efibank-signature", HeaderValue::from_static("s3cret"));
    let ack = h.pix.handle_webhook(&signed, &payload).await.unwrap();
    assert!(ack.created);
}

#[tokio::test]
async fn webhook_without_known_txid_is_acknowledged() {
    let h = Harness::new();

    let ack = h
        .pix
        .handle_webhook(&HeaderMap::new(), &json!({ "evento": "teste_webhook" }))
        .await
        .unwrap();
    assert!(ack.ok);
    assert!(ack.order_id.is_none());

    let ack = h
        .pix
        .handle_webhook(
            &HeaderMap::new(),
            &json!({ "event": "payment.succeeded", "data": { "txid": "unknown-txid" } }),
        )
        .await
        .unwrap();
    assert!(ack.ok);
    assert!(!ack.created);
    assert!(h.store.orders().await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_webhook_and_poll_create_one_order() {
    for _ in 0..20 {
        let h = Harness::new();
        let tee = product("Camiseta", 5000, 10);
        h.store.add_product(tee.clone()).await;
        let user = Uuid::new_v4();
        let created = checkout(&h, user, json!([{ "product_id": tee.id, "checked": true }])).await;
        let txid = created.payment.txid.clone();
        h.gateway.mark_paid(&txid, 5000, Utc::now()).await;

        let headers = HeaderMap::new();
        let payload = pix_payload(&txid);
        let (webhook, poll) = tokio::join!(
            h.pix.handle_webhook(&headers, &payload),
            h.pix.poll_status(user, created.pending_payment_id),
        );
        let webhook = webhook.expect("webhook");
        let poll = poll.expect("poll");

        assert_eq!(poll.status, "paid");
        // A webhook arriving after the poll finished sees no pending payment.
        if webhook.order_id.is_some() {
            assert_eq!(poll.order_id, webhook.order_id);
        }
        assert!(webhook.created ^ poll.created);
        assert_eq!(h.store.orders().await.len(), 1);
        assert_eq!(h.notifier.count().await, 1);
        assert_eq!(h.store.stock(tee.id).await, Some(9));
    }
}

#[tokio::test]
async fn one_order_takes_stock_from_each_product() {
    let h = Harness::new();
    let tee = product("Camiseta", 5000, 5);
    let cap = product("Boné", 3000, 5);
    h.store.add_product(tee.clone()).await;
    h.store.add_product(cap.clone()).await;
    let created = checkout(
        &h,
        Uuid::new_v4(),
        json!([
            { "product_id": tee.id, "checked": true, "quantity": 3 },
            { "product_id": cap.id, "checked": true, "quantity": 3 }
        ]),
    )
    .await;
    assert_eq!(created.summary.total, 24000);

    let ack = h
        .pix
        .handle_webhook(&HeaderMap::new(), &pix_payload(&created.payment.txid))
        .await
        .unwrap();
    assert!(ack.created);

    assert_eq!(h.store.orders().await.len(), 1);
    assert_eq!(h.store.stock(tee.id).await, Some(2));
    assert_eq!(h.store.stock(cap.id).await, Some(2));
}

#[tokio::test]
async fn only_the_materializing_poll_reports_creation() {
    let h = Harness::new();
    let tee = product("Camiseta", 5000, 10);
    h.store.add_product(tee.clone()).await;
    let user = Uuid::new_v4();
    let created = checkout(&h, user, json!([{ "product_id": tee.id, "checked": true }])).await;
    h.gateway
        .mark_paid(&created.payment.txid, 5000, Utc::now())
        .await;

    let first = h.pix.poll_status(user, created.pending_payment_id).await.unwrap();
    assert_eq!(first.status, "paid");
    assert!(first.created);

    let second = h.pix.poll_status(user, created.pending_payment_id).await.unwrap();
    assert_eq!(second.order_id, first.order_id);
    assert!(!second.created);
}
