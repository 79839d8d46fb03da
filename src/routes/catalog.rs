use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::catalog::{
        CategoryList, CreateCategoryRequest, CreateTagRequest, SetProductTagsRequest, ShopStats,
        TagList, UpdateCategoryRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Category, Tag},
    money::GhsConversion,
    response::ApiResponse,
    routes::params::ExchangeRateQuery,
    services::catalog_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories))
        .route("/categories/featured", get(list_featured_categories))
        .route("/tags", get(list_tags))
        .route("/stats", get(shop_stats))
        .route("/exchange-rate", get(exchange_rate))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/categories", post(create_category))
        .route("/categories/{key}", put(update_category).delete(delete_category))
        .route("/tags", post(create_tag))
        .route("/products/{id}/tags", put(set_product_tags))
}

#[utoipa::path(
    get,
    path = "/api/shop/categories",
    responses(
        (status = 200, description = "All categories with active product counts", body = ApiResponse<CategoryList>)
    ),
    tag = "Catalog"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<CategoryList>>> {
    let resp = catalog_service::list_categories(&state, false).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/shop/categories/featured",
    responses(
        (status = 200, description = "Featured categories", body = ApiResponse<CategoryList>)
    ),
    tag = "Catalog"
)]
pub async fn list_featured_categories(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<CategoryList>>> {
    let resp = catalog_service::list_categories(&state, true).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/shop/tags",
    responses(
        (status = 200, description = "Product tags", body = ApiResponse<TagList>)
    ),
    tag = "Catalog"
)]
pub async fn list_tags(State(state): State<AppState>) -> AppResult<Json<ApiResponse<TagList>>> {
    let resp = catalog_service::list_tags(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/shop/stats",
    responses(
        (status = 200, description = "Storefront counters", body = ApiResponse<ShopStats>)
    ),
    tag = "Catalog"
)]
pub async fn shop_stats(State(state): State<AppState>) -> AppResult<Json<ApiResponse<ShopStats>>> {
    let resp = catalog_service::shop_stats(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/shop/exchange-rate",
    params(
        ("amount_cents" = Option<i64>, Query, description = "USD amount in cents, default 100")
    ),
    responses(
        (status = 200, description = "USD to GHS conversion", body = ApiResponse<GhsConversion>),
        (status = 400, description = "Negative amount"),
    ),
    tag = "Catalog"
)]
pub async fn exchange_rate(
    State(state): State<AppState>,
    Query(query): Query<ExchangeRateQuery>,
) -> AppResult<Json<ApiResponse<GhsConversion>>> {
    let resp = catalog_service::exchange_rate(&state, query.amount_cents)?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 200, description = "Create category", body = ApiResponse<Category>),
        (status = 409, description = "Key already used"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_category(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateCategoryRequest>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let resp = catalog_service::create_category(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/categories/{key}",
    params(
        ("key" = String, Path, description = "Category key")
    ),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Update category", body = ApiResponse<Category>),
        (status = 404, description = "Category not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(key): Path<String>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let resp = catalog_service::update_category(&state, &user, &key, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/categories/{key}",
    params(
        ("key" = String, Path, description = "Category key")
    ),
    responses(
        (status = 200, description = "Delete category"),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Category still has products"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(key): Path<String>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = catalog_service::delete_category(&state, &user, &key).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/tags",
    request_body = CreateTagRequest,
    responses(
        (status = 200, description = "Create tag", body = ApiResponse<Tag>),
        (status = 409, description = "Tag already exists"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_tag(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateTagRequest>,
) -> AppResult<Json<ApiResponse<Tag>>> {
    let resp = catalog_service::create_tag(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/products/{id}/tags",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = SetProductTagsRequest,
    responses(
        (status = 200, description = "Replace product tags", body = ApiResponse<TagList>),
        (status = 400, description = "Unknown tag names"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn set_product_tags(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetProductTagsRequest>,
) -> AppResult<Json<ApiResponse<TagList>>> {
    let resp = catalog_service::set_product_tags(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
