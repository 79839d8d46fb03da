pub mod auth;
pub mod catalog;
pub mod orders;
pub mod products;
pub mod promo_codes;
pub mod reviews;
pub mod shipping;
pub mod variants;
