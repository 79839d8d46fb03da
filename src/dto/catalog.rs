use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Category, Tag};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCategoryRequest {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub image_url: Option<String>,
    #[serde(default)]
    pub featured: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCategoryRequest {
    pub label: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub featured: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CategoryList {
    #[schema(value_type = Vec<Category>)]
    pub items: Vec<Category>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTagRequest {
    pub name: String,
    pub display_name: String,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetProductTagsRequest {
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct TagList {
    #[schema(value_type = Vec<Tag>)]
    pub items: Vec<Tag>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShopStats {
    pub total_products: i64,
    pub total_categories: i64,
    pub featured_products: i64,
    pub categories: Vec<Category>,
}
