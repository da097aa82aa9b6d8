use utoipa::{
    Modify, OpenApi,
    openapi::{
        self, OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{AuthResponse, LoginRequest, RegisterRequest, UpdateProfileRequest},
        coupons::{CouponList, CreateCouponRequest, UpdateCouponRequest, ValidateCouponRequest},
        favorites::{AddFavoriteRequest, FavoriteProductList, FavoriteState},
        orders::{
            AdminOrder, AdminOrderList, AppliedCoupon, CheckoutItem, CheckoutPayment,
            CheckoutRequest, CheckoutResponse, CheckoutSummary, OrderList, PaymentStatusView,
            UpdateOrderStatusRequest, WebhookAck,
        },
        products::{CreateProductRequest, InventoryAdjustRequest, ProductList, UpdateProductRequest},
        settings::{SiteSettingMap, SiteSettingValue, UpdateSiteSettingRequest},
    },
    models::{
        Coupon, CouponType, Favorite, LineItem, Order, PaymentRecord, Product, SiteSetting, User,
    },
    response::{ApiResponse, Meta},
    routes::{
        admin, auth, coupons, favorites, health, orders, params, products, settings, webhook,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::me,
        auth::update_me,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        favorites::list_favorites,
        favorites::add_favorite,
        favorites::remove_favorite,
        favorites::toggle_favorite,
        favorites::check_favorite,
        coupons::validate_coupon,
        coupons::list_coupons,
        coupons::create_coupon,
        coupons::update_coupon,
        coupons::delete_coupon,
        settings::list_settings,
        settings::get_setting,
        settings::update_setting,
        orders::checkout,
        orders::payment_status,
        orders::list_my_orders,
        orders::get_order,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::list_low_stock,
        admin::adjust_inventory,
        webhook::efibank_webhook
    ),
    components(
        schemas(
            User,
            Product,
            Favorite,
            Coupon,
            CouponType,
            LineItem,
            PaymentRecord,
            Order,
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            UpdateProfileRequest,
            CreateProductRequest,
            UpdateProductRequest,
            InventoryAdjustRequest,
            ProductList,
            AddFavoriteRequest,
            FavoriteProductList,
            FavoriteState,
            SiteSetting,
            SiteSettingValue,
            SiteSettingMap,
            UpdateSiteSettingRequest,
            ValidateCouponRequest,
            CreateCouponRequest,
            UpdateCouponRequest,
            CouponList,
            CheckoutItem,
            CheckoutRequest,
            CheckoutPayment,
            CheckoutSummary,
            AppliedCoupon,
            CheckoutResponse,
            PaymentStatusView,
            WebhookAck,
            OrderList,
            AdminOrder,
            AdminOrderList,
            UpdateOrderStatusRequest,
            params::Pagination,
            params::OrderListQuery,
            params::LowStockQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CheckoutResponse>,
            ApiResponse<PaymentStatusView>,
            ApiResponse<OrderList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and profile"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Favorites", description = "Favorite products"),
        (name = "Coupons", description = "Discount coupons"),
        (name = "Settings", description = "Storefront settings edited by admins"),
        (name = "Orders", description = "PIX checkout and order tracking"),
        (name = "Admin", description = "Order and inventory management"),
        (name = "Webhook", description = "Payment provider notifications"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
