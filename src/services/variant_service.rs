use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::sea_query::LockType;
use uuid::Uuid;

use crate::{
    audit,
    dto::variants::{
        ColorList, CreateColorRequest, CreateSizeRequest, CreateVariantRequest,
        InventoryAdjustRequest, LowStockReport, SizeList, UpdateVariantRequest,
    },
    entity::{
        product_colors::{
            ActiveModel as ColorActive, Column as ColorCol, Entity as ProductColors,
            Model as ColorModel,
        },
        product_sizes::{
            ActiveModel as SizeActive, Column as SizeCol, Entity as ProductSizes,
            Model as SizeModel,
        },
        product_variants::{
            ActiveModel as VariantActive, Column as VariantCol, Entity as ProductVariants,
            Model as VariantModel,
        },
        products::{ActiveModel as ProductActive, Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{ProductColor, ProductSize, ProductSummary, ProductVariant},
    money::format_usd,
    response::{ApiResponse, Meta},
    routes::params::LowStockQuery,
    services::{
        catalog_service::is_hex_color,
        product_service::build_summaries,
        stock::{VariantStock, variant_final_price},
    },
    state::AppState,
};

pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;

/// New stock level after applying `delta`, rejecting no-ops and negative results.
pub fn apply_delta(current: i32, delta: i32) -> Result<i32, String> {
    if delta == 0 {
        return Err("delta must not be zero".into());
    }
    let next = current
        .checked_add(delta)
        .ok_or_else(|| "stock adjustment out of range".to_string())?;
    if next < 0 {
        return Err(format!(
            "cannot remove {} units, only {} in stock",
            -delta, current
        ));
    }
    Ok(next)
}

fn size_from_entity(model: SizeModel) -> ProductSize {
    ProductSize {
        id: model.id,
        name: model.name,
        display_name: model.display_name,
        position: model.position,
    }
}

fn color_from_entity(model: ColorModel) -> ProductColor {
    ProductColor {
        id: model.id,
        name: model.name,
        hex_code: model.hex_code,
        position: model.position,
    }
}

pub(crate) fn variant_from_parts(
    row: &VariantModel,
    product_price: i64,
    size: ProductSize,
    color: ProductColor,
) -> ProductVariant {
    let final_price = variant_final_price(product_price, row.price_adjustment);
    let stock = VariantStock {
        stock_quantity: row.stock_quantity,
        is_available: row.is_available,
    };
    ProductVariant {
        id: row.id,
        product_id: row.product_id,
        size,
        color,
        stock_quantity: row.stock_quantity,
        price_adjustment: row.price_adjustment,
        final_price,
        final_price_display: format_usd(final_price),
        is_available: row.is_available,
        is_in_stock: stock.is_in_stock(),
    }
}

async fn hydrate<C: ConnectionTrait>(
    db: &C,
    rows: Vec<VariantModel>,
    prices: &HashMap<Uuid, i64>,
) -> AppResult<Vec<ProductVariant>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let size_ids: HashSet<Uuid> = rows.iter().map(|r| r.size_id).collect();
    let color_ids: HashSet<Uuid> = rows.iter().map(|r| r.color_id).collect();

    let sizes: HashMap<Uuid, ProductSize> = ProductSizes::find()
        .filter(SizeCol::Id.is_in(size_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|s| (s.id, size_from_entity(s)))
        .collect();
    let colors: HashMap<Uuid, ProductColor> = ProductColors::find()
        .filter(ColorCol::Id.is_in(color_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, color_from_entity(c)))
        .collect();

    let mut variants: Vec<ProductVariant> = rows
        .iter()
        .filter_map(|row| {
            let size = sizes.get(&row.size_id)?.clone();
            let color = colors.get(&row.color_id)?.clone();
            let price = prices.get(&row.product_id).copied().unwrap_or_default();
            Some(variant_from_parts(row, price, size, color))
        })
        .collect();
    variants.sort_by_key(|v| (v.product_id, v.size.position, v.color.position));
    Ok(variants)
}

/// Variants of the given `(product_id, product_price)` pairs with sizes and colors resolved.
pub(crate) async fn load_variants<C: ConnectionTrait>(
    db: &C,
    products: &[(Uuid, i64)],
) -> AppResult<Vec<ProductVariant>> {
    let prices: HashMap<Uuid, i64> = products.iter().copied().collect();
    let rows = ProductVariants::find()
        .filter(VariantCol::ProductId.is_in(prices.keys().copied()))
        .all(db)
        .await?;
    hydrate(db, rows, &prices).await
}

/// Distinct sizes and colors offered by available variants, in display order.
pub fn available_options(variants: &[ProductVariant]) -> (Vec<ProductSize>, Vec<ProductColor>) {
    let mut sizes: Vec<ProductSize> = Vec::new();
    let mut colors: Vec<ProductColor> = Vec::new();
    for v in variants.iter().filter(|v| v.is_available) {
        if !sizes.iter().any(|s| s.id == v.size.id) {
            sizes.push(v.size.clone());
        }
        if !colors.iter().any(|c| c.id == v.color.id) {
            colors.push(v.color.clone());
        }
    }
    sizes.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.name.cmp(&b.name)));
    colors.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.name.cmp(&b.name)));
    (sizes, colors)
}

pub async fn list_sizes(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<SizeList>> {
    ensure_admin(user)?;
    let items: Vec<ProductSize> = ProductSizes::find()
        .order_by_asc(SizeCol::Position)
        .order_by_asc(SizeCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(size_from_entity)
        .collect();
    let meta = Meta::total(items.len() as i64);
    Ok(ApiResponse::success("Sizes", SizeList { items }, Some(meta)))
}

pub async fn create_size(
    state: &AppState,
    user: &AuthUser,
    payload: CreateSizeRequest,
) -> AppResult<ApiResponse<ProductSize>> {
    ensure_admin(user)?;
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }
    let taken = ProductSizes::find()
        .filter(SizeCol::Name.eq(name.as_str()))
        .count(&state.orm)
        .await?;
    if taken > 0 {
        return Err(AppError::Conflict(format!("size {name} already exists")));
    }

    let display_name = payload
        .display_name
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| name.clone());
    let size = SizeActive {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        display_name: Set(display_name),
        position: Set(payload.position),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "size_create",
        "product_sizes",
        serde_json::json!({ "size_id": size.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Size created",
        size_from_entity(size),
        Some(Meta::empty()),
    ))
}

pub async fn list_colors(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<ColorList>> {
    ensure_admin(user)?;
    let items: Vec<ProductColor> = ProductColors::find()
        .order_by_asc(ColorCol::Position)
        .order_by_asc(ColorCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(color_from_entity)
        .collect();
    let meta = Meta::total(items.len() as i64);
    Ok(ApiResponse::success("Colors", ColorList { items }, Some(meta)))
}

pub async fn create_color(
    state: &AppState,
    user: &AuthUser,
    payload: CreateColorRequest,
) -> AppResult<ApiResponse<ProductColor>> {
    ensure_admin(user)?;
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }
    if !is_hex_color(&payload.hex_code) {
        return Err(AppError::BadRequest("hex_code must look like #RRGGBB".into()));
    }
    let taken = ProductColors::find()
        .filter(ColorCol::Name.eq(name.as_str()))
        .count(&state.orm)
        .await?;
    if taken > 0 {
        return Err(AppError::Conflict(format!("color {name} already exists")));
    }

    let color = ColorActive {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        hex_code: Set(payload.hex_code.to_uppercase()),
        position: Set(payload.position),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "color_create",
        "product_colors",
        serde_json::json!({ "color_id": color.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Color created",
        color_from_entity(color),
        Some(Meta::empty()),
    ))
}

async fn single_variant<C: ConnectionTrait>(db: &C, row: VariantModel) -> AppResult<ProductVariant> {
    let product = Products::find_by_id(row.product_id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound)?;
    let prices = HashMap::from([(product.id, product.price)]);
    hydrate(db, vec![row], &prices)
        .await?
        .pop()
        .ok_or(AppError::NotFound)
}

pub async fn create_variant(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: CreateVariantRequest,
) -> AppResult<ApiResponse<ProductVariant>> {
    ensure_admin(user)?;
    if payload.stock_quantity < 0 {
        return Err(AppError::BadRequest("stock_quantity must not be negative".into()));
    }
    Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    ProductSizes::find_by_id(payload.size_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("unknown size".into()))?;
    ProductColors::find_by_id(payload.color_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("unknown color".into()))?;

    let duplicate = ProductVariants::find()
        .filter(VariantCol::ProductId.eq(product_id))
        .filter(VariantCol::SizeId.eq(payload.size_id))
        .filter(VariantCol::ColorId.eq(payload.color_id))
        .count(&state.orm)
        .await?;
    if duplicate > 0 {
        return Err(AppError::Conflict(
            "a variant with this size and color already exists".into(),
        ));
    }

    let row = VariantActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        size_id: Set(payload.size_id),
        color_id: Set(payload.color_id),
        stock_quantity: Set(payload.stock_quantity),
        price_adjustment: Set(payload.price_adjustment),
        is_available: Set(payload.is_available),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "variant_create",
        "product_variants",
        serde_json::json!({ "product_id": product_id, "variant_id": row.id }),
    )
    .await;

    let data = single_variant(&state.orm, row).await?;
    Ok(ApiResponse::success("Variant created", data, Some(Meta::empty())))
}

pub async fn update_variant(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateVariantRequest,
) -> AppResult<ApiResponse<ProductVariant>> {
    ensure_admin(user)?;
    if payload.stock_quantity.is_some_and(|s| s < 0) {
        return Err(AppError::BadRequest("stock_quantity must not be negative".into()));
    }
    let existing = ProductVariants::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: VariantActive = existing.into();
    if let Some(stock) = payload.stock_quantity {
        active.stock_quantity = Set(stock);
    }
    if let Some(adjustment) = payload.price_adjustment {
        active.price_adjustment = Set(adjustment);
    }
    if let Some(is_available) = payload.is_available {
        active.is_available = Set(is_available);
    }
    let row = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "variant_update",
        "product_variants",
        serde_json::json!({ "variant_id": row.id }),
    )
    .await;

    let data = single_variant(&state.orm, row).await?;
    Ok(ApiResponse::success("Updated", data, Some(Meta::empty())))
}

pub async fn delete_variant(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = ProductVariants::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "variant_delete",
        "product_variants",
        serde_json::json!({ "variant_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn low_stock(
    state: &AppState,
    user: &AuthUser,
    query: LowStockQuery,
) -> AppResult<ApiResponse<LowStockReport>> {
    ensure_admin(user)?;
    let threshold = query.threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD).max(0);

    let products = Products::find()
        .filter(ProdCol::StockQuantity.lte(threshold))
        .order_by_asc(ProdCol::StockQuantity)
        .order_by_asc(ProdCol::Title)
        .all(&state.orm)
        .await?;
    let products = build_summaries(&state.orm, products).await?;

    let rows = ProductVariants::find()
        .filter(VariantCol::StockQuantity.lte(threshold))
        .order_by_asc(VariantCol::StockQuantity)
        .all(&state.orm)
        .await?;
    let product_ids: HashSet<Uuid> = rows.iter().map(|r| r.product_id).collect();
    let prices: HashMap<Uuid, i64> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|p| (p.id, p.price))
        .collect();
    let mut variants = hydrate(&state.orm, rows, &prices).await?;
    variants.sort_by_key(|v| v.stock_quantity);

    let meta = Meta::total((products.len() + variants.len()) as i64);
    Ok(ApiResponse::success(
        "Low stock",
        LowStockReport { products, variants },
        Some(meta),
    ))
}

pub async fn adjust_product_stock(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: InventoryAdjustRequest,
) -> AppResult<ApiResponse<ProductSummary>> {
    ensure_admin(user)?;
    let txn = state.orm.begin().await?;
    let product = Products::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let before = product.stock_quantity;
    let next = apply_delta(before, payload.delta).map_err(AppError::BadRequest)?;

    let mut active: ProductActive = product.into();
    active.stock_quantity = Set(next);
    active.updated_at = Set(Utc::now().into());
    let product = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(product_id = %id, before, after = next, "product stock adjusted");
    audit::record(
        &state.pool,
        Some(user.user_id),
        "inventory_adjust",
        "products",
        serde_json::json!({ "product_id": id, "delta": payload.delta, "stock": next }),
    )
    .await;

    let mut items = build_summaries(&state.orm, vec![product]).await?;
    let data = items.pop().ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Stock adjusted", data, Some(Meta::empty())))
}

pub async fn adjust_variant_stock(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: InventoryAdjustRequest,
) -> AppResult<ApiResponse<ProductVariant>> {
    ensure_admin(user)?;
    let txn = state.orm.begin().await?;
    let row = ProductVariants::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let before = row.stock_quantity;
    let next = apply_delta(before, payload.delta).map_err(AppError::BadRequest)?;

    let mut active: VariantActive = row.into();
    active.stock_quantity = Set(next);
    let row = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(variant_id = %id, before, after = next, "variant stock adjusted");
    audit::record(
        &state.pool,
        Some(user.user_id),
        "inventory_adjust",
        "product_variants",
        serde_json::json!({ "variant_id": id, "delta": payload.delta, "stock": next }),
    )
    .await;

    let data = single_variant(&state.orm, row).await?;
    Ok(ApiResponse::success("Stock adjusted", data, Some(Meta::empty())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(name: &str, position: i32) -> ProductSize {
        ProductSize {
            id: Uuid::new_v4(),
            name: name.into(),
            display_name: name.into(),
            position,
        }
    }

    fn color(name: &str, position: i32) -> ProductColor {
        ProductColor {
            id: Uuid::new_v4(),
            name: name.into(),
            hex_code: "#000000".into(),
            position,
        }
    }

    fn row(stock: i32, adjustment: i64, available: bool) -> VariantModel {
        VariantModel {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            size_id: Uuid::new_v4(),
            color_id: Uuid::new_v4(),
            stock_quantity: stock,
            price_adjustment: adjustment,
            is_available: available,
        }
    }

    #[test]
    fn deltas() {
        assert_eq!(apply_delta(5, 3), Ok(8));
        assert_eq!(apply_delta(5, -5), Ok(0));
        assert!(apply_delta(5, 0).is_err());
        assert_eq!(
            apply_delta(2, -3).unwrap_err(),
            "cannot remove 3 units, only 2 in stock"
        );
        assert!(apply_delta(i32::MAX, 1).is_err());
    }

    #[test]
    fn variant_pricing_and_stock() {
        let v = variant_from_parts(&row(4, 500, true), 2500, size("L", 3), color("Black", 1));
        assert_eq!(v.final_price, 3000);
        assert_eq!(v.final_price_display, "$30.00");
        assert!(v.is_in_stock);

        let v = variant_from_parts(&row(4, 0, false), 2500, size("L", 3), color("Black", 1));
        assert!(!v.is_in_stock);
    }

    #[test]
    fn options_come_from_available_variants_in_position_order() {
        let (s, m, l) = (size("S", 1), size("M", 2), size("L", 3));
        let (red, blue) = (color("Red", 2), color("Blue", 1));
        let variants = vec![
            variant_from_parts(&row(1, 0, true), 100, l.clone(), red.clone()),
            variant_from_parts(&row(1, 0, true), 100, s.clone(), blue.clone()),
            variant_from_parts(&row(0, 0, true), 100, s.clone(), red.clone()),
            variant_from_parts(&row(9, 0, false), 100, m.clone(), red.clone()),
        ];

        let (sizes, colors) = available_options(&variants);
        assert_eq!(sizes, vec![s, l]);
        assert_eq!(colors, vec![blue, red]);
    }
}
