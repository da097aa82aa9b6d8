use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::coupons::{CouponList, CreateCouponRequest, UpdateCouponRequest, ValidateCouponRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Coupon,
    response::ApiResponse,
    services::coupon_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_coupons).post(create_coupon))
        .route("/validate", post(validate_coupon))
        .route("/{id}", put(update_coupon).delete(delete_coupon))
}

#[utoipa::path(
    post,
    path = "/api/coupons/validate",
    request_body = ValidateCouponRequest,
    responses(
        (status = 200, description = "Coupon can be applied", body = ApiResponse<Coupon>),
        (status = 400, description = "Inactive, expired or exhausted"),
        (status = 404, description = "Unknown coupon")
    ),
    security(("bearer_auth" = [])),
    tag = "Coupons"
)]
pub async fn validate_coupon(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<ValidateCouponRequest>,
) -> AppResult<Json<ApiResponse<Coupon>>> {
    Ok(Json(coupon_service::validate_coupon(&state, payload).await?))
}

#[utoipa::path(
    get,
    path = "/api/coupons",
    responses((status = 200, description = "All coupons", body = ApiResponse<CouponList>)),
    security(("bearer_auth" = [])),
    tag = "Coupons"
)]
pub async fn list_coupons(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CouponList>>> {
    Ok(Json(coupon_service::list_coupons(&state, &user).await?))
}

#[utoipa::path(
    post,
    path = "/api/coupons",
    request_body = CreateCouponRequest,
    responses(
        (status = 200, description = "Coupon created", body = ApiResponse<Coupon>),
        (status = 400, description = "Validation failed")
    ),
    security(("bearer_auth" = [])),
    tag = "Coupons"
)]
pub async fn create_coupon(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateCouponRequest>,
) -> AppResult<Json<ApiResponse<Coupon>>> {
    Ok(Json(
        coupon_service::create_coupon(&state, &user, payload).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/coupons/{id}",
    params(("id" = Uuid, Path, description = "Coupon ID")),
    request_body = UpdateCouponRequest,
    responses((status = 200, description = "Coupon updated", body = ApiResponse<Coupon>)),
    security(("bearer_auth" = [])),
    tag = "Coupons"
)]
pub async fn update_coupon(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCouponRequest>,
) -> AppResult<Json<ApiResponse<Coupon>>> {
    Ok(Json(
        coupon_service::update_coupon(&state, &user, id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/coupons/{id}",
    params(("id" = Uuid, Path, description = "Coupon ID")),
    responses((status = 200, description = "Coupon deleted")),
    security(("bearer_auth" = [])),
    tag = "Coupons"
)]
pub async fn delete_coupon(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(coupon_service::delete_coupon(&state, &user, id).await?))
}
