use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::settings::{SiteSettingMap, UpdateSiteSettingRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::SiteSetting,
    response::ApiResponse,
    services::settings_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_settings))
        .route("/{key}", get(get_setting).put(update_setting))
}

#[utoipa::path(
    get,
    path = "/api/site-settings",
    responses(
        (status = 200, description = "All settings keyed by name", body = ApiResponse<SiteSettingMap>)
    ),
    tag = "Settings"
)]
pub async fn list_settings(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<SiteSettingMap>>> {
    Ok(Json(settings_service::list_settings(&state).await?))
}

#[utoipa::path(
    get,
    path = "/api/site-settings/{key}",
    params(("key" = String, Path, description = "Setting key")),
    responses(
        (status = 200, description = "Setting", body = ApiResponse<SiteSetting>),
        (status = 404, description = "Unknown setting")
    ),
    tag = "Settings"
)]
pub async fn get_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Json<ApiResponse<SiteSetting>>> {
    Ok(Json(settings_service::get_setting(&state, &key).await?))
}

#[utoipa::path(
    put,
    path = "/api/site-settings/{key}",
    params(("key" = String, Path, description = "Setting key")),
    request_body = UpdateSiteSettingRequest,
    responses(
        (status = 200, description = "Setting updated or created", body = ApiResponse<SiteSetting>),
        (status = 400, description = "Missing value or malformed key"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn update_setting(
    State(state): State<AppState>,
    user: AuthUser,
    Path(key): Path<String>,
    Json(payload): Json<UpdateSiteSettingRequest>,
) -> AppResult<Json<ApiResponse<SiteSetting>>> {
    Ok(Json(
        settings_service::update_setting(&state, &user, &key, payload).await?,
    ))
}
