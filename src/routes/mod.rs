use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod catalog;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;
pub mod products;
pub mod promo_codes;
pub mod reviews;
pub mod shipping;

/// Public storefront routes, mounted under `/api/shop`.
pub fn shop_router() -> Router<AppState> {
    Router::new()
        .merge(catalog::router())
        .merge(products::router())
        .merge(reviews::router())
        .merge(promo_codes::router())
        .merge(orders::router())
}

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/shop", shop_router())
        .nest("/shipping", shipping::router())
        .nest("/auth", auth::router())
        .nest("/admin", admin::router())
}
