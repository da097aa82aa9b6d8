use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait, sea_query::LockType,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::{
        orders::{AdminOrder, AdminOrderList, UpdateOrderStatusRequest},
        products::{InventoryAdjustRequest, ProductList},
    },
    entity::{Orders, Products, Users, orders, products, users},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderStatus, Product},
    payments::postgres::{order_from_entity, product_from_entity},
    response::{ApiResponse, Meta},
    routes::params::{LowStockQuery, OrderListQuery},
    state::AppState,
};

const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;

fn admin_order(order: orders::Model, customer: Option<users::Model>) -> AppResult<AdminOrder> {
    Ok(AdminOrder {
        order: order_from_entity(order)?,
        customer_name: customer.as_ref().map(|c| c.name.clone()),
        customer_email: customer.map(|c| c.email),
    })
}

/// Parse an admin-supplied status. Only the known labels and `outros` are accepted.
pub fn parse_order_status(value: &str) -> AppResult<OrderStatus> {
    let status = OrderStatus::from(value);
    if status == OrderStatus::Outros && value.trim().to_lowercase() != OrderStatus::Outros.as_str() {
        return Err(AppError::Validation(format!("Invalid order status: {value}")));
    }
    Ok(status)
}

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<AdminOrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut finder = Orders::find();
    if let Some(status) = query.status.as_deref().filter(|s| !s.is_empty()) {
        finder = finder.filter(orders::Column::Status.eq(OrderStatus::from(status).as_str()));
    }
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .order_by_desc(orders::Column::CreatedAt)
        .find_also_related(Users)
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|(order, customer)| admin_order(order, customer))
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "Orders",
        AdminOrderList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<AdminOrder>> {
    ensure_admin(user)?;
    let (order, customer) = Orders::find_by_id(id)
        .find_also_related(Users)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success(
        "Order found",
        admin_order(order, customer)?,
        Some(Meta::empty()),
    ))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let next = parse_order_status(&payload.status)?;

    let existing = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let current = OrderStatus::from(existing.status.as_str());
    if !current.can_move_to(next) {
        return Err(AppError::Validation(format!(
            "Order cannot move back from \"{current}\" to \"{next}\""
        )));
    }

    let mut active: orders::ActiveModel = existing.into();
    active.status = Set(next.as_str().to_string());
    if let Some(estimate) = payload.delivery_estimate {
        let estimate = estimate.trim().to_string();
        active.delivery_estimate = Set((!estimate.is_empty()).then_some(estimate));
    }
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": order.id, "from": current, "to": next }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order updated",
        order_from_entity(order)?,
        Some(Meta::empty()),
    ))
}

pub async fn list_low_stock(
    state: &AppState,
    user: &AuthUser,
    query: LowStockQuery,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_admin(user)?;
    let threshold = query.threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
    let (page, limit, offset) = query.pagination().normalize();

    let finder = Products::find()
        .filter(products::Column::Stock.lte(threshold))
        .order_by_asc(products::Column::Stock)
        .order_by_desc(products::Column::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Low stock",
        ProductList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn adjust_inventory(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: InventoryAdjustRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    if payload.delta == 0 {
        return Err(AppError::Validation("delta must not be 0".into()));
    }

    let txn = state.orm.begin().await?;
    let product = Products::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let new_stock = adjusted_stock(product.stock, payload.delta)?;

    let mut active: products::ActiveModel = product.into();
    active.stock = Set(new_stock);
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "inventory_adjust",
        "products",
        serde_json::json!({ "product_id": updated.id, "delta": payload.delta }),
    )
    .await;

    Ok(ApiResponse::success(
        "Inventory updated",
        product_from_entity(updated),
        Some(Meta::empty()),
    ))
}

fn adjusted_stock(current: i32, delta: i32) -> AppResult<i32> {
    match current.checked_add(delta) {
        Some(stock) if stock >= 0 => Ok(stock),
        Some(_) => Err(AppError::Validation("Stock cannot be negative".into())),
        None => Err(AppError::Validation("Stock adjustment is out of range".into())),
    }
}
