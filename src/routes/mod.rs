use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod coupons;
pub mod doc;
pub mod favorites;
pub mod health;
pub mod orders;
pub mod params;
pub mod products;
pub mod settings;
pub mod webhook;

/// Everything mounted under `/api`; state is provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", auth::users_router())
        .nest("/products", products::router())
        .nest("/favorites", favorites::router())
        .nest("/coupons", coupons::router())
        .nest("/site-settings", settings::router())
        .nest("/orders", orders::router())
        .nest("/admin", admin::router())
        .nest("/webhook", webhook::router())
}
