use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch, post, put},
};
use uuid::Uuid;

use crate::{
    dto::variants::{
        ColorList, CreateColorRequest, CreateSizeRequest, CreateVariantRequest,
        InventoryAdjustRequest, LowStockReport, SizeList, UpdateVariantRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{ProductColor, ProductSize, ProductSummary, ProductVariant},
    response::ApiResponse,
    routes::{catalog, orders, params::LowStockQuery, products, promo_codes, reviews},
    services::variant_service,
    state::AppState,
};

/// Every staff-only route, mounted under `/api/admin`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sizes", get(list_sizes).post(create_size))
        .route("/colors", get(list_colors).post(create_color))
        .route("/products/{id}/variants", post(create_variant))
        .route("/variants/{id}", put(update_variant).delete(delete_variant))
        .route("/inventory/low-stock", get(list_low_stock))
        .route("/inventory/products/{id}", patch(adjust_product_stock))
        .route("/inventory/variants/{id}", patch(adjust_variant_stock))
        .merge(catalog::admin_router())
        .merge(products::admin_router())
        .merge(reviews::admin_router())
        .merge(promo_codes::admin_router())
        .merge(orders::admin_router())
}

#[utoipa::path(
    get,
    path = "/api/admin/sizes",
    responses(
        (status = 200, description = "Sizes", body = ApiResponse<SizeList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_sizes(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<SizeList>>> {
    let resp = variant_service::list_sizes(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/sizes",
    request_body = CreateSizeRequest,
    responses(
        (status = 200, description = "Create size", body = ApiResponse<ProductSize>),
        (status = 409, description = "Size already exists"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_size(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateSizeRequest>,
) -> AppResult<Json<ApiResponse<ProductSize>>> {
    let resp = variant_service::create_size(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/colors",
    responses(
        (status = 200, description = "Colors", body = ApiResponse<ColorList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_colors(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ColorList>>> {
    let resp = variant_service::list_colors(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/colors",
    request_body = CreateColorRequest,
    responses(
        (status = 200, description = "Create color", body = ApiResponse<ProductColor>),
        (status = 409, description = "Color already exists"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_color(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateColorRequest>,
) -> AppResult<Json<ApiResponse<ProductColor>>> {
    let resp = variant_service::create_color(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/products/{id}/variants",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = CreateVariantRequest,
    responses(
        (status = 200, description = "Create variant", body = ApiResponse<ProductVariant>),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Size and color already used"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_variant(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateVariantRequest>,
) -> AppResult<Json<ApiResponse<ProductVariant>>> {
    let resp = variant_service::create_variant(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/variants/{id}",
    params(
        ("id" = Uuid, Path, description = "Variant ID")
    ),
    request_body = UpdateVariantRequest,
    responses(
        (status = 200, description = "Update variant", body = ApiResponse<ProductVariant>),
        (status = 404, description = "Variant not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_variant(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateVariantRequest>,
) -> AppResult<Json<ApiResponse<ProductVariant>>> {
    let resp = variant_service::update_variant(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/variants/{id}",
    params(
        ("id" = Uuid, Path, description = "Variant ID")
    ),
    responses(
        (status = 200, description = "Delete variant"),
        (status = 404, description = "Variant not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_variant(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = variant_service::delete_variant(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/inventory/low-stock",
    params(
        ("threshold" = Option<i32>, Query, description = "Stock at or below this is low, default 5")
    ),
    responses(
        (status = 200, description = "Low stock products and variants", body = ApiResponse<LowStockReport>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_low_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<LowStockQuery>,
) -> AppResult<Json<ApiResponse<LowStockReport>>> {
    let resp = variant_service::low_stock(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/inventory/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = InventoryAdjustRequest,
    responses(
        (status = 200, description = "Adjust product stock", body = ApiResponse<ProductSummary>),
        (status = 400, description = "Zero delta or negative result"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn adjust_product_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<InventoryAdjustRequest>,
) -> AppResult<Json<ApiResponse<ProductSummary>>> {
    let resp = variant_service::adjust_product_stock(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/inventory/variants/{id}",
    params(
        ("id" = Uuid, Path, description = "Variant ID")
    ),
    request_body = InventoryAdjustRequest,
    responses(
        (status = 200, description = "Adjust variant stock", body = ApiResponse<ProductVariant>),
        (status = 400, description = "Zero delta or negative result"),
        (status = 404, description = "Variant not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn adjust_variant_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<InventoryAdjustRequest>,
) -> AppResult<Json<ApiResponse<ProductVariant>>> {
    let resp = variant_service::adjust_variant_stock(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
