use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};

use crate::{
    audit,
    dto::settings::{SiteSettingMap, SiteSettingValue, UpdateSiteSettingRequest},
    entity::{SiteSettings, site_settings},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::SiteSetting,
    response::{ApiResponse, Meta},
    state::AppState,
};

const MAX_KEY_LEN: usize = 64;
const MAX_VALUE_LEN: usize = 10_000;

fn setting_from_entity(model: site_settings::Model) -> SiteSetting {
    SiteSetting {
        key: model.key,
        value: model.value,
        kind: model.kind,
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

/// Keys are short identifiers such as `hero_title` or `banner.color`.
pub fn validate_setting_key(key: &str) -> AppResult<()> {
    let valid = !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if !valid {
        return Err(AppError::Validation(format!(
            "Setting key must be 1-{MAX_KEY_LEN} characters of letters, digits, '_', '-' or '.'"
        )));
    }
    Ok(())
}

pub fn validate_setting_value(value: Option<String>) -> AppResult<String> {
    let value = value.ok_or_else(|| AppError::Validation("value is required".into()))?;
    if value.chars().count() > MAX_VALUE_LEN {
        return Err(AppError::Validation(format!(
            "value must be at most {MAX_VALUE_LEN} characters"
        )));
    }
    Ok(value)
}

pub async fn list_settings(state: &AppState) -> AppResult<ApiResponse<SiteSettingMap>> {
    let settings = SiteSettings::find()
        .order_by_asc(site_settings::Column::Key)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|s| {
            (
                s.key,
                SiteSettingValue {
                    value: s.value,
                    kind: s.kind,
                },
            )
        })
        .collect();

    Ok(ApiResponse::success(
        "OK",
        SiteSettingMap { settings },
        None,
    ))
}

pub async fn get_setting(state: &AppState, key: &str) -> AppResult<ApiResponse<SiteSetting>> {
    let setting = SiteSettings::find_by_id(key.to_string())
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success(
        "OK",
        setting_from_entity(setting),
        Some(Meta::empty()),
    ))
}

/// Updates the value in place, or creates a `text` setting when the key is new.
pub async fn update_setting(
    state: &AppState,
    user: &AuthUser,
    key: &str,
    payload: UpdateSiteSettingRequest,
) -> AppResult<ApiResponse<SiteSetting>> {
    ensure_admin(user)?;
    validate_setting_key(key)?;
    let value = validate_setting_value(payload.value)?;
    let now = Utc::now();

    let existing = SiteSettings::find_by_id(key.to_string())
        .one(&state.orm)
        .await?;
    let (saved, message) = match existing {
        Some(setting) => {
            let mut active: site_settings::ActiveModel = setting.into();
            active.value = Set(value);
            active.updated_at = Set(now.into());
            active.updated_by = Set(Some(user.user_id));
            (active.update(&state.orm).await?, "Setting updated")
        }
        None => {
            let created = site_settings::ActiveModel {
                key: Set(key.to_string()),
                value: Set(value),
                kind: Set("text".to_string()),
                updated_at: Set(now.into()),
                updated_by: Set(Some(user.user_id)),
            }
            .insert(&state.orm)
            .await?;
            (created, "Setting created")
        }
    };

    audit::record(
        &state.pool,
        Some(user.user_id),
        "site_setting_update",
        "site_settings",
        serde_json::json!({ "key": saved.key }),
    )
    .await;

    Ok(ApiResponse::success(
        message,
        setting_from_entity(saved),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setting_keys_are_plain_identifiers() {
        assert!(validate_setting_key("hero_title").is_ok());
        assert!(validate_setting_key("banner.bg-color").is_ok());
        assert!(validate_setting_key("").is_err());
        assert!(validate_setting_key("has space").is_err());
        assert!(validate_setting_key(&"k".repeat(65)).is_err());
    }

    #[test]
    fn setting_value_must_be_present() {
        assert!(matches!(
            validate_setting_value(None),
            Err(AppError::Validation(_))
        ));
        assert_eq!(validate_setting_value(Some(String::new())).unwrap(), "");
        assert!(validate_setting_value(Some("x".repeat(10_001))).is_err());
    }
}
