use axum::http::HeaderMap;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{CheckoutRequest, CheckoutResponse, OrderList, PaymentStatusView, WebhookAck},
    entity::{Orders, orders},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Order,
    payments::postgres::order_from_entity,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub async fn list_my_orders(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = Orders::find().filter(orders::Column::UserId.eq(user.user_id));
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .order_by_desc(orders::Column::CreatedAt)
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ApiResponse::success(
        "Ok",
        OrderList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_my_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let model = Orders::find_by_id(id)
        .filter(orders::Column::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success(
        "OK",
        order_from_entity(model)?,
        Some(Meta::empty()),
    ))
}

pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    let response = state.pix.checkout(user.user_id, payload).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "checkout",
        "pending_payments",
        serde_json::json!({
            "pending_payment_id": response.pending_payment_id,
            "txid": response.payment.txid,
            "total": response.summary.total,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "PIX payment created",
        response,
        Some(Meta::empty()),
    ))
}

pub async fn payment_status(
    state: &AppState,
    user: &AuthUser,
    pending_id: Uuid,
) -> AppResult<ApiResponse<PaymentStatusView>> {
    let view = state.pix.poll_status(user.user_id, pending_id).await?;
    if view.created {
        audit::record(
            &state.pool,
            Some(user.user_id),
            "payment_confirmed",
            "orders",
            serde_json::json!({ "order_id": view.order_id, "source": "poll" }),
        )
        .await;
    }
    Ok(ApiResponse::success("Payment status", view, None))
}

pub async fn handle_webhook(
    state: &AppState,
    headers: &HeaderMap,
    payload: &Value,
) -> AppResult<WebhookAck> {
    let ack = state.pix.handle_webhook(headers, payload).await?;
    if ack.created {
        audit::record(
            &state.pool,
            None,
            "payment_confirmed",
            "orders",
            serde_json::json!({ "order_id": ack.order_id, "source": "webhook" }),
        )
        .await;
    }
    Ok(ack)
}
