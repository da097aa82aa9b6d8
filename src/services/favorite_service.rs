use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::favorites::{AddFavoriteRequest, FavoriteProductList, FavoriteState},
    entity::{Favorites, Products, favorites},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Favorite,
    payments::postgres::product_from_entity,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub async fn list_favorites(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<FavoriteProductList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = Favorites::find().filter(favorites::Column::UserId.eq(user.user_id));

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .order_by_desc(favorites::Column::CreatedAt)
        .find_also_related(Products)
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .filter_map(|(_, product)| product.map(product_from_entity))
        .collect();

    Ok(ApiResponse::success(
        "OK",
        FavoriteProductList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn add_favorite(
    state: &AppState,
    user: &AuthUser,
    payload: AddFavoriteRequest,
) -> AppResult<ApiResponse<Favorite>> {
    if Products::find_by_id(payload.product_id)
        .one(&state.orm)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound);
    }

    let existing = Favorites::find()
        .filter(favorites::Column::UserId.eq(user.user_id))
        .filter(favorites::Column::ProductId.eq(payload.product_id))
        .one(&state.orm)
        .await?;

    let favorite = match existing {
        Some(fav) => fav,
        None => {
            let fav = favorites::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user.user_id),
                product_id: Set(payload.product_id),
                created_at: Set(Utc::now().into()),
            }
            .insert(&state.orm)
            .await?;
            audit::record(
                &state.pool,
                Some(user.user_id),
                "favorite_add",
                "favorites",
                serde_json::json!({ "product_id": payload.product_id }),
            )
            .await;
            fav
        }
    };

    Ok(ApiResponse::success(
        "Added to favorites",
        Favorite {
            id: favorite.id,
            product_id: favorite.product_id,
            user_id: favorite.user_id,
            created_at: favorite.created_at.with_timezone(&Utc),
        },
        Some(Meta::empty()),
    ))
}

pub async fn remove_favorite(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = Favorites::delete_many()
        .filter(favorites::Column::UserId.eq(user.user_id))
        .filter(favorites::Column::ProductId.eq(product_id))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "favorite_remove",
        "favorites",
        serde_json::json!({ "product_id": product_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Removed from favorites",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Adds the product when it is not a favorite yet, removes it otherwise.
pub async fn toggle_favorite(
    state: &AppState,
    user: &AuthUser,
    payload: AddFavoriteRequest,
) -> AppResult<ApiResponse<FavoriteState>> {
    let product_id = payload.product_id;
    if Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound);
    }

    let removed = Favorites::delete_many()
        .filter(favorites::Column::UserId.eq(user.user_id))
        .filter(favorites::Column::ProductId.eq(product_id))
        .exec(&state.orm)
        .await?
        .rows_affected;

    let (is_favorite, action, message) = if removed > 0 {
        (false, "favorite_remove", "Removed from favorites")
    } else {
        favorites::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.user_id),
            product_id: Set(product_id),
            created_at: Set(Utc::now().into()),
        }
        .insert(&state.orm)
        .await?;
        (true, "favorite_add", "Added to favorites")
    };

    audit::record(
        &state.pool,
        Some(user.user_id),
        action,
        "favorites",
        serde_json::json!({ "product_id": product_id }),
    )
    .await;

    Ok(ApiResponse::success(
        message,
        FavoriteState {
            product_id,
            is_favorite,
        },
        Some(Meta::empty()),
    ))
}

pub async fn check_favorite(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<FavoriteState>> {
    let count = Favorites::find()
        .filter(favorites::Column::UserId.eq(user.user_id))
        .filter(favorites::Column::ProductId.eq(product_id))
        .count(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "OK",
        FavoriteState {
            product_id,
            is_favorite: count > 0,
        },
        Some(Meta::empty()),
    ))
}
