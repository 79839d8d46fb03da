use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    audit,
    dto::catalog::{
        CategoryList, CreateCategoryRequest, CreateTagRequest, SetProductTagsRequest, ShopStats,
        TagList, UpdateCategoryRequest,
    },
    entity::{
        categories::{ActiveModel as CategoryActive, Column as CategoryCol, Entity as Categories},
        product_tag_assignments::{
            ActiveModel as AssignmentActive, Column as AssignmentCol,
            Entity as ProductTagAssignments,
        },
        product_tags::{ActiveModel as TagActive, Column as TagCol, Entity as ProductTags, Model as TagModel},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Category, Tag},
    money::{GhsConversion, convert_usd_to_ghs},
    response::{ApiResponse, Meta},
    state::AppState,
};

const DEFAULT_TAG_COLOR: &str = "#6b7280";

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    key: String,
    label: String,
    description: String,
    image_url: Option<String>,
    featured: bool,
    product_count: i64,
    created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            key: row.key,
            label: row.label,
            description: row.description,
            image: row.image_url,
            featured: row.featured,
            product_count: row.product_count,
            created_at: row.created_at,
        }
    }
}

/// Category keys are lowercase ASCII letters, digits and hyphens.
pub fn validate_category_key(key: &str) -> Result<(), String> {
    if key.is_empty() {
        return Err("category key must not be empty".into());
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err("category key may only contain a-z, 0-9 and '-'".into());
    }
    Ok(())
}

pub fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

async fn fetch_categories(state: &AppState, featured_only: bool) -> AppResult<Vec<Category>> {
    let rows: Vec<CategoryRow> = sqlx::query_as(
        r#"
        SELECT c.id, c.key, c.label, c.description, c.image_url, c.featured, c.created_at,
               COUNT(p.id) FILTER (WHERE p.is_active) AS product_count
        FROM categories c
        LEFT JOIN products p ON p.category_key = c.key
        WHERE ($1 = FALSE OR c.featured)
        GROUP BY c.id
        ORDER BY c.label
        "#,
    )
    .bind(featured_only)
    .fetch_all(&state.pool)
    .await?;

    Ok(rows.into_iter().map(Category::from).collect())
}

async fn fetch_category(state: &AppState, key: &str) -> AppResult<Category> {
    let row: Option<CategoryRow> = sqlx::query_as(
        r#"
        SELECT c.id, c.key, c.label, c.description, c.image_url, c.featured, c.created_at,
               COUNT(p.id) FILTER (WHERE p.is_active) AS product_count
        FROM categories c
        LEFT JOIN products p ON p.category_key = c.key
        WHERE c.key = $1
        GROUP BY c.id
        "#,
    )
    .bind(key)
    .fetch_optional(&state.pool)
    .await?;

    row.map(Category::from).ok_or(AppError::NotFound)
}

pub async fn list_categories(
    state: &AppState,
    featured_only: bool,
) -> AppResult<ApiResponse<CategoryList>> {
    let items = fetch_categories(state, featured_only).await?;
    let meta = Meta::total(items.len() as i64);
    Ok(ApiResponse::success("Categories", CategoryList { items }, Some(meta)))
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;
    let key = payload.key.trim().to_string();
    validate_category_key(&key).map_err(AppError::BadRequest)?;
    if payload.label.trim().is_empty() {
        return Err(AppError::BadRequest("label must not be empty".into()));
    }

    let exists = Categories::find()
        .filter(CategoryCol::Key.eq(key.as_str()))
        .one(&state.orm)
        .await?;
    if exists.is_some() {
        return Err(AppError::Conflict(format!("category {key} already exists")));
    }

    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        key: Set(key),
        label: Set(payload.label.trim().to_string()),
        description: Set(payload.description),
        image_url: Set(payload.image_url),
        featured: Set(payload.featured),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "category_create",
        "categories",
        serde_json::json!({ "key": category.key }),
    )
    .await;

    let data = fetch_category(state, &category.key).await?;
    Ok(ApiResponse::success("Category created", data, Some(Meta::empty())))
}

pub async fn update_category(
    state: &AppState,
    user: &AuthUser,
    key: &str,
    payload: UpdateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;
    let existing = Categories::find()
        .filter(CategoryCol::Key.eq(key))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: CategoryActive = existing.into();
    if let Some(label) = payload.label {
        if label.trim().is_empty() {
            return Err(AppError::BadRequest("label must not be empty".into()));
        }
        active.label = Set(label.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(image_url) = payload.image_url {
        active.image_url = Set(Some(image_url).filter(|u| !u.is_empty()));
    }
    if let Some(featured) = payload.featured {
        active.featured = Set(featured);
    }
    active.updated_at = Set(Utc::now().into());
    let category = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "category_update",
        "categories",
        serde_json::json!({ "key": category.key }),
    )
    .await;

    let data = fetch_category(state, &category.key).await?;
    Ok(ApiResponse::success("Updated", data, Some(Meta::empty())))
}

pub async fn delete_category(
    state: &AppState,
    user: &AuthUser,
    key: &str,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let existing = Categories::find()
        .filter(CategoryCol::Key.eq(key))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let in_use = Products::find()
        .filter(ProdCol::CategoryKey.eq(key))
        .count(&state.orm)
        .await?;
    if in_use > 0 {
        return Err(AppError::Conflict(format!(
            "category {key} still has {in_use} products"
        )));
    }

    Categories::delete_by_id(existing.id).exec(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "category_delete",
        "categories",
        serde_json::json!({ "key": key }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub(crate) fn tag_from_entity(model: TagModel) -> Tag {
    Tag {
        name: model.name,
        display_name: model.display_name,
        color: model.color,
    }
}

pub async fn list_tags(state: &AppState) -> AppResult<ApiResponse<TagList>> {
    let items: Vec<Tag> = ProductTags::find()
        .order_by_asc(TagCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(tag_from_entity)
        .collect();

    let meta = Meta::total(items.len() as i64);
    Ok(ApiResponse::success("Tags", TagList { items }, Some(meta)))
}

pub async fn create_tag(
    state: &AppState,
    user: &AuthUser,
    payload: CreateTagRequest,
) -> AppResult<ApiResponse<Tag>> {
    ensure_admin(user)?;
    let name = payload.name.trim().to_lowercase();
    if name.is_empty() || payload.display_name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "name and display_name must not be empty".into(),
        ));
    }
    let color = payload
        .color
        .unwrap_or_else(|| DEFAULT_TAG_COLOR.to_string());
    if !is_hex_color(&color) {
        return Err(AppError::BadRequest("color must look like #RRGGBB".into()));
    }

    let exists = ProductTags::find()
        .filter(TagCol::Name.eq(name.as_str()))
        .one(&state.orm)
        .await?;
    if exists.is_some() {
        return Err(AppError::Conflict(format!("tag {name} already exists")));
    }

    let tag = TagActive {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        display_name: Set(payload.display_name.trim().to_string()),
        color: Set(color),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "tag_create",
        "product_tags",
        serde_json::json!({ "name": tag.name }),
    )
    .await;

    Ok(ApiResponse::success(
        "Tag created",
        tag_from_entity(tag),
        Some(Meta::empty()),
    ))
}

/// Replace the full tag set of a product.
pub async fn set_product_tags(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: SetProductTagsRequest,
) -> AppResult<ApiResponse<TagList>> {
    ensure_admin(user)?;
    Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let wanted: HashSet<String> = payload
        .tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    let tags = if wanted.is_empty() {
        Vec::new()
    } else {
        ProductTags::find()
            .filter(TagCol::Name.is_in(wanted.iter().cloned()))
            .order_by_asc(TagCol::Name)
            .all(&state.orm)
            .await?
    };

    if tags.len() != wanted.len() {
        let known: HashSet<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        let mut unknown: Vec<&str> = wanted
            .iter()
            .map(String::as_str)
            .filter(|name| !known.contains(name))
            .collect();
        unknown.sort_unstable();
        return Err(AppError::BadRequest(format!(
            "unknown tags: {}",
            unknown.join(", ")
        )));
    }

    let txn = state.orm.begin().await?;
    ProductTagAssignments::delete_many()
        .filter(AssignmentCol::ProductId.eq(product_id))
        .exec(&txn)
        .await?;
    for tag in &tags {
        AssignmentActive {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            tag_id: Set(tag.id),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
    }
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_tags_set",
        "products",
        serde_json::json!({ "product_id": product_id, "tags": wanted }),
    )
    .await;

    let items: Vec<Tag> = tags.into_iter().map(tag_from_entity).collect();
    let meta = Meta::total(items.len() as i64);
    Ok(ApiResponse::success("Tags updated", TagList { items }, Some(meta)))
}

pub async fn shop_stats(state: &AppState) -> AppResult<ApiResponse<ShopStats>> {
    let total_products = Products::find()
        .filter(ProdCol::IsActive.eq(true))
        .count(&state.orm)
        .await? as i64;
    let featured_products = Products::find()
        .filter(ProdCol::IsActive.eq(true))
        .filter(ProdCol::IsFeatured.eq(true))
        .count(&state.orm)
        .await? as i64;
    let categories = fetch_categories(state, false).await?;

    Ok(ApiResponse::success(
        "Stats",
        ShopStats {
            total_products,
            total_categories: categories.len() as i64,
            featured_products,
            categories,
        },
        Some(Meta::empty()),
    ))
}

pub fn exchange_rate(state: &AppState, amount_cents: Option<i64>) -> AppResult<ApiResponse<GhsConversion>> {
    let amount = amount_cents.unwrap_or(100);
    if amount < 0 {
        return Err(AppError::BadRequest("amount_cents must not be negative".into()));
    }
    let conversion = convert_usd_to_ghs(amount, state.config.usd_to_ghs_rate);
    Ok(ApiResponse::success("Exchange rate", conversion, Some(Meta::empty())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_keys() {
        assert!(validate_category_key("t-shirts").is_ok());
        assert!(validate_category_key("caps2").is_ok());
        assert!(validate_category_key("").is_err());
        assert!(validate_category_key("T-Shirts").is_err());
        assert!(validate_category_key("hats & caps").is_err());
    }

    #[test]
    fn hex_colors() {
        assert!(is_hex_color("#1F2937"));
        assert!(!is_hex_color("1F2937"));
        assert!(!is_hex_color("#12345"));
        assert!(!is_hex_color("#12345G"));
    }
}
