use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::coupons::{CouponList, CreateCouponRequest, UpdateCouponRequest, ValidateCouponRequest},
    entity::{Coupons, Orders, coupons, orders},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Coupon, CouponType},
    payments::{
        checkout::{ensure_coupon_usable, normalize_coupon_code},
        postgres::coupon_from_entity,
    },
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn validate_code(code: &str) -> AppResult<()> {
    let len = code.chars().count();
    if !(3..=30).contains(&len) || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::Validation(
            "Coupon code must be alphanumeric with 3 to 30 characters".into(),
        ));
    }
    Ok(())
}

pub fn parse_kind(kind: &str) -> AppResult<CouponType> {
    CouponType::parse(kind.trim())
        .ok_or_else(|| AppError::Validation("Coupon type must be percentage or fixed".into()))
}

pub fn validate_value(kind: CouponType, value: i64) -> AppResult<()> {
    if value <= 0 {
        return Err(AppError::Validation("Coupon value must be greater than zero".into()));
    }
    if kind == CouponType::Percentage && value > 100 {
        return Err(AppError::Validation("Percentage coupons cannot exceed 100".into()));
    }
    Ok(())
}

/// `YYYY-MM-DD` means the end of that day in UTC; anything else must be RFC 3339.
/// The date may not lie before `now`'s day.
pub fn parse_expiry(value: &str, now: DateTime<Utc>) -> AppResult<DateTime<Utc>> {
    let value = value.trim();
    let invalid = || AppError::Validation("Invalid expiration date".into());
    let expires_at = match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) => date.and_hms_opt(23, 59, 59).ok_or_else(invalid)?.and_utc(),
        Err(_) => DateTime::parse_from_rfc3339(value)
            .map_err(|_| invalid())?
            .with_timezone(&Utc),
    };
    if expires_at.date_naive() < now.date_naive() {
        return Err(AppError::Validation(
            "Expiration date must be today or in the future".into(),
        ));
    }
    Ok(expires_at)
}

fn validate_usage_limit(limit: Option<i32>) -> AppResult<()> {
    if limit.is_some_and(|l| l < 0) {
        return Err(AppError::Validation("Usage limit cannot be negative".into()));
    }
    Ok(())
}

async fn ensure_code_free(state: &AppState, code: &str, except: Option<Uuid>) -> AppResult<()> {
    let mut finder = Coupons::find().filter(coupons::Column::Code.eq(code));
    if let Some(id) = except {
        finder = finder.filter(coupons::Column::Id.ne(id));
    }
    if finder.one(&state.orm).await?.is_some() {
        return Err(AppError::Validation("Coupon code already exists".into()));
    }
    Ok(())
}

pub async fn validate_coupon(
    state: &AppState,
    payload: ValidateCouponRequest,
) -> AppResult<ApiResponse<Coupon>> {
    let code = normalize_coupon_code(&payload.code);
    if code.is_empty() {
        return Err(AppError::Validation("Coupon code is required".into()));
    }
    let model = Coupons::find()
        .filter(coupons::Column::Code.eq(code.as_str()))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let coupon = coupon_from_entity(model)?;

    let used = Orders::find()
        .filter(orders::Column::CouponCode.eq(coupon.code.as_str()))
        .count(&state.orm)
        .await? as i64;
    ensure_coupon_usable(&coupon, used, Utc::now())?;

    Ok(ApiResponse::success("Coupon is valid", coupon, None))
}

pub async fn list_coupons(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CouponList>> {
    ensure_admin(user)?;
    let items = Coupons::find()
        .order_by_desc(coupons::Column::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(coupon_from_entity)
        .collect::<Result<Vec<_>, _>>()?;
    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Coupons",
        CouponList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn create_coupon(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCouponRequest,
) -> AppResult<ApiResponse<Coupon>> {
    ensure_admin(user)?;
    let code = normalize_coupon_code(&payload.code);
    validate_code(&code)?;
    let kind = parse_kind(&payload.kind)?;
    validate_value(kind, payload.value)?;
    validate_usage_limit(payload.usage_limit)?;
    let now = Utc::now();
    let expires_at = parse_expiry(&payload.expires_at, now)?;
    ensure_code_free(state, &code, None).await?;

    let model = coupons::ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set(code),
        kind: Set(kind.as_str().to_string()),
        value: Set(payload.value),
        active: Set(payload.active.unwrap_or(true)),
        expires_at: Set(expires_at.into()),
        usage_limit: Set(payload.usage_limit),
        created_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "coupon_create",
        "coupons",
        serde_json::json!({ "coupon_id": model.id, "code": model.code }),
    )
    .await;

    Ok(ApiResponse::success(
        "Coupon created",
        coupon_from_entity(model)?,
        Some(Meta::empty()),
    ))
}

pub async fn update_coupon(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCouponRequest,
) -> AppResult<ApiResponse<Coupon>> {
    ensure_admin(user)?;
    let existing = Coupons::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let kind = match payload.kind.as_deref() {
        Some(kind) => parse_kind(kind)?,
        None => parse_kind(&existing.kind)?,
    };
    validate_value(kind, payload.value.unwrap_or(existing.value))?;
    validate_usage_limit(payload.usage_limit)?;

    let mut active: coupons::ActiveModel = existing.into();
    if let Some(code) = payload.code {
        let code = normalize_coupon_code(&code);
        validate_code(&code)?;
        ensure_code_free(state, &code, Some(id)).await?;
        active.code = Set(code);
    }
    active.kind = Set(kind.as_str().to_string());
    if let Some(value) = payload.value {
        active.value = Set(value);
    }
    if let Some(expires_at) = payload.expires_at {
        active.expires_at = Set(parse_expiry(&expires_at, Utc::now())?.into());
    }
    if let Some(limit) = payload.usage_limit {
        active.usage_limit = Set(Some(limit));
    }
    if let Some(flag) = payload.active {
        active.active = Set(flag);
    }
    let model = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "coupon_update",
        "coupons",
        serde_json::json!({ "coupon_id": model.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Coupon updated",
        coupon_from_entity(model)?,
        Some(Meta::empty()),
    ))
}

pub async fn delete_coupon(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Coupons::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "coupon_delete",
        "coupons",
        serde_json::json!({ "coupon_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Coupon deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
