mod common;

use std::sync::Arc;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};
use serde_json::json;
use uuid::Uuid;

use common::{CountingNotifier, FakeGateway};
use hypex_storefront_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{coupons::CreateCouponRequest, orders::UpdateOrderStatusRequest},
    entity::{products::ActiveModel as ProductActive, users::ActiveModel as UserActive},
    error::AppError,
    middleware::auth::AuthUser,
    models::OrderStatus,
    payments::{PixCheckout, postgres::PgStore},
    routes::params::{LowStockQuery, Pagination},
    services::{admin_service, coupon_service, order_service},
    state::AppState,
};

// Checkout with a coupon -> provider reports paid -> poll creates the order,
// a late webhook is a no-op; admin moves the order forward and sees low stock.
#[tokio::test]
async fn pix_checkout_reconciliation_flow() -> anyhow::Result<()> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let gateway = Arc::new(FakeGateway::default());
    let notifier = Arc::new(CountingNotifier::default());
    let state = setup_state(&database_url, gateway.clone(), notifier.clone()).await?;

    let user_id = create_user(&state, "user", "cliente@example.com").await?;
    let admin_id = create_user(&state, "admin", "admin@example.com").await?;
    let auth_user = AuthUser {
        user_id,
        role: "user".into(),
    };
    let auth_admin = AuthUser {
        user_id: admin_id,
        role: "admin".into(),
    };

    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set("Camiseta Teste".into()),
        description: Set(Some("Produto de teste".into())),
        price: Set(10000),
        stock: Set(10),
        image_url: NotSet,
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    coupon_service::create_coupon(
        &state,
        &auth_admin,
        CreateCouponRequest {
            code: "hype10".into(),
            kind: "percentage".into(),
            value: 10,
            expires_at: "2099-12-31".into(),
            usage_limit: None,
            active: None,
        },
    )
    .await?;

    let checkout = order_service::checkout(
        &state,
        &auth_user,
        serde_json::from_value(json!({
            "items": [{ "product_id": product.id, "checked": true, "quantity": 2 }],
            "address": { "rua": "Av. Paulista", "numero": "1000" },
            "coupon_code": "HYPE10"
        }))?,
    )
    .await?
    .data
    .expect("checkout data");
    assert_eq!(checkout.summary.total, 18000);

    // Nothing is ordered until the payment is confirmed.
    let mine = order_service::list_my_orders(&state, &auth_user, Pagination::default()).await?;
    assert!(mine.data.expect("orders").items.is_empty());

    gateway
        .mark_paid(&checkout.payment.txid, 18000, Utc::now())
        .await;
    let status = order_service::payment_status(&state, &auth_user, checkout.pending_payment_id)
        .await?
        .data
        .expect("status");
    assert_eq!(status.status, "paid");
    let order_id = status.order_id.expect("order id");

    let ack = order_service::handle_webhook(
        &state,
        &Default::default(),
        &json!({ "pix": [{ "txid": checkout.payment.txid }] }),
    )
    .await?;
    assert!(!ack.created);

    let mine = order_service::list_my_orders(&state, &auth_user, Pagination::default())
        .await?
        .data
        .expect("orders");
    assert_eq!(mine.items.len(), 1);
    assert_eq!(mine.items[0].id, order_id);
    assert_eq!(mine.items[0].coupon_code.as_deref(), Some("HYPE10"));
    assert_eq!(notifier.count().await, 1);

    let updated = admin_service::update_order_status(
        &state,
        &auth_admin,
        order_id,
        UpdateOrderStatusRequest {
            status: "enviado".into(),
            delivery_estimate: Some("3 dias úteis".into()),
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(updated.status, OrderStatus::Enviado);
    assert_eq!(updated.delivery_estimate.as_deref(), Some("3 dias úteis"));

    let backwards = admin_service::update_order_status(
        &state,
        &auth_admin,
        order_id,
        UpdateOrderStatusRequest {
            status: "pedido feito".into(),
            delivery_estimate: None,
        },
    )
    .await;
    assert!(matches!(backwards, Err(AppError::Validation(_))));

    // Stock went from 10 to 8 when the payment was confirmed.
    let low = admin_service::list_low_stock(
        &state,
        &auth_admin,
        LowStockQuery {
            page: Some(1),
            per_page: Some(20),
            threshold: Some(8),
        },
    )
    .await?
    .data
    .expect("products");
    let listed = low
        .items
        .iter()
        .find(|p| p.id == product.id)
        .expect("product in low-stock list");
    assert_eq!(listed.stock, 8);

    Ok(())
}

async fn setup_state(
    database_url: &str,
    gateway: Arc<FakeGateway>,
    notifier: Arc<CountingNotifier>,
) -> anyhow::Result<AppState> {
    let orm = create_orm_conn(database_url).await?;
    let pool = create_pool(database_url).await?;
    run_migrations(&orm).await?;

    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE orders, pending_payments, favorites, coupons, audit_logs, products, users CASCADE",
    ))
    .await?;

    let pix = PixCheckout::new(Arc::new(PgStore::new(orm.clone())), gateway, notifier, None);
    Ok(AppState {
        pool,
        orm,
        pix: Arc::new(pix),
        jwt_secret: Arc::from("test-secret"),
    })
}

async fn create_user(state: &AppState, role: &str, email: &str) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set(format!("Test {role}")),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        role: Set(role.into()),
        address: NotSet,
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}
