mod common;

use std::sync::Arc;

use sea_orm::ActiveModelTrait;
use sea_orm::ActiveValue::NotSet;
use sea_orm::Set;
use uuid::Uuid;

use common::{CountingNotifier, FakeGateway};
use hypex_storefront_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{favorites::AddFavoriteRequest, settings::UpdateSiteSettingRequest},
    entity::{products::ActiveModel as ProductActive, users::ActiveModel as UserActive},
    error::AppError,
    middleware::auth::AuthUser,
    payments::{PixCheckout, postgres::PgStore},
    services::{favorite_service, settings_service},
    state::AppState,
};

async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let Ok(database_url) =
        std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL"))
    else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run storefront tests.");
        return Ok(None);
    };

    let orm = create_orm_conn(&database_url).await?;
    let pool = create_pool(&database_url).await?;
    run_migrations(&orm).await?;

    let pix = PixCheckout::new(
        Arc::new(PgStore::new(orm.clone())),
        Arc::new(FakeGateway::default()),
        Arc::new(CountingNotifier::default()),
        None,
    );
    Ok(Some(AppState {
        pool,
        orm,
        pix: Arc::new(pix),
        jwt_secret: Arc::from("test-secret"),
    }))
}

async fn create_user(state: &AppState, role: &str) -> anyhow::Result<AuthUser> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set(format!("Test {role}")),
        email: Set(format!("{}@example.com", Uuid::new_v4())),
        password_hash: Set("dummy".into()),
        role: Set(role.into()),
        address: NotSet,
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        role: role.into(),
    })
}

async fn is_favorite(state: &AppState, user: &AuthUser, product_id: Uuid) -> anyhow::Result<bool> {
    let view = favorite_service::check_favorite(state, user, product_id).await?;
    Ok(view.data.expect("favorite state").is_favorite)
}

#[tokio::test]
async fn favorite_toggle_flips_and_check_follows() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = create_user(&state, "user").await?;
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set("Moletom Teste".into()),
        description: NotSet,
        price: Set(20000),
        stock: Set(5),
        image_url: NotSet,
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    assert!(!is_favorite(&state, &user, product.id).await?);

    let toggled = favorite_service::toggle_favorite(
        &state,
        &user,
        AddFavoriteRequest {
            product_id: product.id,
        },
    )
    .await?
    .data
    .expect("state");
    assert!(toggled.is_favorite);
    assert!(is_favorite(&state, &user, product.id).await?);

    let toggled = favorite_service::toggle_favorite(
        &state,
        &user,
        AddFavoriteRequest {
            product_id: product.id,
        },
    )
    .await?
    .data
    .expect("state");
    assert!(!toggled.is_favorite);
    assert!(!is_favorite(&state, &user, product.id).await?);

    let missing = favorite_service::toggle_favorite(
        &state,
        &user,
        AddFavoriteRequest {
            product_id: Uuid::new_v4(),
        },
    )
    .await;
    assert!(matches!(missing, Err(AppError::NotFound)));

    Ok(())
}

#[tokio::test]
async fn site_settings_are_upserted_by_admins_only() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let admin = create_user(&state, "admin").await?;
    let customer = create_user(&state, "user").await?;
    let key = format!("hero_title_{}", Uuid::new_v4().simple());

    let missing = settings_service::get_setting(&state, &key).await;
    assert!(matches!(missing, Err(AppError::NotFound)));

    let forbidden = settings_service::update_setting(
        &state,
        &customer,
        &key,
        UpdateSiteSettingRequest {
            value: Some("Nova coleção".into()),
        },
    )
    .await;
    assert!(matches!(forbidden, Err(AppError::Forbidden)));

    let no_value = settings_service::update_setting(
        &state,
        &admin,
        &key,
        UpdateSiteSettingRequest { value: None },
    )
    .await;
    assert!(matches!(no_value, Err(AppError::Validation(_))));

    let created = settings_service::update_setting(
        &state,
        &admin,
        &key,
        UpdateSiteSettingRequest {
            value: Some("Nova coleção".into()),
        },
    )
    .await?;
    assert_eq!(created.message, "Setting created");
    let created = created.data.expect("setting");
    assert_eq!(created.kind, "text");

    let updated = settings_service::update_setting(
        &state,
        &admin,
        &key,
        UpdateSiteSettingRequest {
            value: Some("Drop de inverno".into()),
        },
    )
    .await?;
    assert_eq!(updated.message, "Setting updated");

    let fetched = settings_service::get_setting(&state, &key)
        .await?
        .data
        .expect("setting");
    assert_eq!(fetched.value, "Drop de inverno");

    let all = settings_service::list_settings(&state)
        .await?
        .data
        .expect("settings");
    assert_eq!(
        all.settings.get(&key).map(|s| s.value.as_str()),
        Some("Drop de inverno")
    );

    Ok(())
}
