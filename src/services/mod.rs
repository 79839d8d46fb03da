pub mod auth_service;
pub mod catalog_service;
pub mod order_service;
pub mod pricing;
pub mod product_service;
pub mod promo_service;
pub mod review_service;
pub mod shipping_service;
pub mod stock;
pub mod variant_service;
