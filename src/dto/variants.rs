use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{ProductColor, ProductSize, ProductSummary, ProductVariant};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSizeRequest {
    pub name: String,
    pub display_name: Option<String>,
    #[serde(default)]
    pub position: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateColorRequest {
    pub name: String,
    pub hex_code: String,
    #[serde(default)]
    pub position: i32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct SizeList {
    #[schema(value_type = Vec<ProductSize>)]
    pub items: Vec<ProductSize>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ColorList {
    #[schema(value_type = Vec<ProductColor>)]
    pub items: Vec<ProductColor>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateVariantRequest {
    pub size_id: Uuid,
    pub color_id: Uuid,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default)]
    pub price_adjustment: i64,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateVariantRequest {
    pub stock_quantity: Option<i32>,
    pub price_adjustment: Option<i64>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InventoryAdjustRequest {
    pub delta: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LowStockReport {
    pub products: Vec<ProductSummary>,
    pub variants: Vec<ProductVariant>,
}
