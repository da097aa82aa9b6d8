pub mod coupons;
pub mod favorites;
pub mod orders;
pub mod pending_payments;
pub mod products;
pub mod site_settings;
pub mod users;

pub use coupons::Entity as Coupons;
pub use favorites::Entity as Favorites;
pub use orders::Entity as Orders;
pub use pending_payments::Entity as PendingPayments;
pub use products::Entity as Products;
pub use site_settings::Entity as SiteSettings;
pub use users::Entity as Users;
