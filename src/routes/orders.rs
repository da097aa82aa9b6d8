use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::orders::{CheckoutRequest, CheckoutResponse, OrderList, PaymentStatusView},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Order,
    response::ApiResponse,
    routes::params::Pagination,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(checkout))
        .route("/mine", get(list_my_orders))
        .route("/pending/{id}/status", get(payment_status))
        .route("/{id}", get(get_order))
}

#[utoipa::path(
    post,
    path = "/api/orders/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "PIX charge created; the order is created once it is paid", body = ApiResponse<CheckoutResponse>),
        (status = 400, description = "Invalid selection or coupon"),
        (status = 404, description = "Unknown product"),
        (status = 409, description = "Insufficient stock"),
        (status = 502, description = "Payment provider failure"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<ApiResponse<CheckoutResponse>>> {
    Ok(Json(order_service::checkout(&state, &user, payload).await?))
}

#[utoipa::path(
    get,
    path = "/api/orders/pending/{id}/status",
    params(("id" = Uuid, Path, description = "Pending payment ID")),
    responses(
        (status = 200, description = "Current payment status", body = ApiResponse<PaymentStatusView>),
        (status = 404, description = "Not found or not owned by the caller"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn payment_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PaymentStatusView>>> {
    Ok(Json(order_service::payment_status(&state, &user, id).await?))
}

#[utoipa::path(
    get,
    path = "/api/orders/mine",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses((status = 200, description = "Orders of the caller", body = ApiResponse<OrderList>)),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_my_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    Ok(Json(
        order_service::list_my_orders(&state, &user, pagination).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order", body = ApiResponse<Order>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    Ok(Json(order_service::get_my_order(&state, &user, id).await?))
}
