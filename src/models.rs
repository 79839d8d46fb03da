use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub const PLACEHOLDER_IMAGE: &str =
    "https://via.placeholder.com/400x400/e5e7eb/6b7280?text=No+Image";

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct Category {
    pub id: Uuid,
    pub key: String,
    pub label: String,
    pub description: String,
    pub image: Option<String>,
    pub featured: bool,
    pub product_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct Tag {
    pub name: String,
    pub display_name: String,
    pub color: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ProductImage {
    pub id: Uuid,
    pub url: String,
    pub alt_text: String,
    pub is_primary: bool,
    pub position: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct ProductSize {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub position: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct ProductColor {
    pub id: Uuid,
    pub name: String,
    pub hex_code: String,
    pub position: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ProductVariant {
    pub id: Uuid,
    pub product_id: Uuid,
    pub size: ProductSize,
    pub color: ProductColor,
    pub stock_quantity: i32,
    pub price_adjustment: i64,
    pub final_price: i64,
    pub final_price_display: String,
    pub is_available: bool,
    pub is_in_stock: bool,
}

/// Product as shown in listings.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ProductSummary {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub price: i64,
    pub price_display: String,
    pub description: String,
    pub image: String,
    pub category: String,
    pub category_label: Option<String>,
    pub stock_quantity: i32,
    pub is_active: bool,
    pub is_featured: bool,
    pub is_in_stock: bool,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: ProductSummary,
    pub images: Vec<ProductImage>,
    pub variants: Vec<ProductVariant>,
    pub available_sizes: Vec<ProductSize>,
    pub available_colors: Vec<ProductColor>,
    pub rating: RatingStats,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct RatingStats {
    pub average_rating: f64,
    pub total_reviews: i64,
    pub rating_distribution: BTreeMap<i16, i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct Review {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_name: String,
    pub rating: i16,
    pub title: String,
    pub comment: String,
    pub size_purchased: Option<String>,
    pub color_purchased: Option<String>,
    pub verified_purchase: bool,
    pub helpful_count: i32,
    pub not_helpful_count: i32,
    pub created_at: DateTime<Utc>,
}

/// Review with the moderation fields staff need.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct AdminReview {
    #[serde(flatten)]
    pub review: Review,
    pub user_email: String,
    pub is_approved: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PromoCode {
    pub id: Uuid,
    pub code: String,
    pub description: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub discount_display: String,
    pub minimum_order_amount: i64,
    pub maximum_discount_amount: Option<i64>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub is_active: bool,
}

/// What shoppers may see about a code before applying it.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PublicPromoCode {
    pub code: String,
    pub description: String,
    pub discount_display: String,
    pub minimum_order_amount: i64,
    pub valid_until: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub customer_email: String,
    pub customer_name: String,
    pub shipping_address: String,
    pub shipping_city: String,
    pub shipping_country: String,
    pub shipping_postal_code: String,
    pub subtotal: i64,
    pub discount_amount: i64,
    pub promo_code: Option<String>,
    pub shipping_cost: i64,
    pub tax_amount: i64,
    pub total: i64,
    pub total_display: String,
    pub status: OrderStatus,
    pub status_display: String,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub payment_method: String,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct OrderItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub product_title: String,
    pub selected_size: Option<String>,
    pub selected_color: Option<String>,
    pub variant_info: Option<String>,
    pub quantity: i32,
    pub unit_price: i64,
    pub total_price: i64,
    pub total_display: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| {
                let valid: Vec<&str> = OrderStatus::ALL.iter().map(|s| s.as_str()).collect();
                format!("Invalid status. Must be one of: {}", valid.join(", "))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    Fixed,
    FreeShipping,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::Fixed => "fixed",
            DiscountType::FreeShipping => "free_shipping",
        }
    }
}

impl FromStr for DiscountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(DiscountType::Percentage),
            "fixed" => Ok(DiscountType::Fixed),
            "free_shipping" => Ok(DiscountType::FreeShipping),
            other => Err(format!("unknown discount type {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing_is_case_insensitive() {
        assert_eq!("Shipped".parse::<OrderStatus>(), Ok(OrderStatus::Shipped));
        assert_eq!(" delivered ".parse::<OrderStatus>(), Ok(OrderStatus::Delivered));
    }

    #[test]
    fn unknown_status_lists_valid_values() {
        let err = "lost".parse::<OrderStatus>().unwrap_err();
        assert_eq!(
            err,
            "Invalid status. Must be one of: pending, processing, shipped, delivered, cancelled"
        );
    }

    #[test]
    fn discount_type_round_trips_through_its_column_value() {
        for kind in [
            DiscountType::Percentage,
            DiscountType::Fixed,
            DiscountType::FreeShipping,
        ] {
            assert_eq!(kind.as_str().parse::<DiscountType>(), Ok(kind));
        }
    }
}
