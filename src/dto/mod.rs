pub mod auth;
pub mod coupons;
pub mod favorites;
pub mod orders;
pub mod products;
pub mod settings;
