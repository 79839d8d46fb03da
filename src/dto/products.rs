use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{ProductImage, ProductSummary};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub title: String,
    pub slug: Option<String>,
    pub price: i64,
    #[serde(default)]
    pub description: String,
    pub image_url: Option<String>,
    pub category: String,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub price: Option<i64>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub stock_quantity: Option<i32>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<ProductSummary>)]
    pub items: Vec<ProductSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SearchResults {
    pub results: Vec<ProductSummary>,
    pub count: i64,
    pub query: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddImageRequest {
    pub url: String,
    #[serde(default)]
    pub alt_text: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub position: i32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ImageList {
    #[schema(value_type = Vec<ProductImage>)]
    pub items: Vec<ProductImage>,
}
