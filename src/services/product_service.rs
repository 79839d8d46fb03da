use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, Query, SelectStatement};
use sea_orm::sea_query::extension::postgres::PgExpr;
use uuid::Uuid;

use crate::{
    audit,
    dto::products::{
        AddImageRequest, CreateProductRequest, ProductList, SearchResults, UpdateProductRequest,
    },
    entity::{
        categories::{Column as CategoryCol, Entity as Categories},
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        product_images::{
            ActiveModel as ImageActive, Column as ImageCol, Entity as ProductImages,
            Model as ImageModel,
        },
        product_tag_assignments::{Column as AssignmentCol, Entity as ProductTagAssignments},
        product_tags::{Column as TagCol, Entity as ProductTags},
        product_variants::{Column as VariantCol, Entity as ProductVariants},
        products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{PLACEHOLDER_IMAGE, ProductDetail, ProductImage, ProductSummary},
    money::format_usd,
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    services::{
        review_service,
        stock::{VariantStock, product_in_stock},
        variant_service,
    },
    state::AppState,
};

const SEARCH_LIMIT: u64 = 50;

/// Lowercase ASCII slug; every run of other characters collapses to one `-`.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// `ILIKE` pattern matching `needle` literally anywhere; `%`, `_` and `\` are escaped.
pub fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

async fn unique_slug<C: ConnectionTrait>(
    db: &C,
    base: &str,
    exclude: Option<Uuid>,
) -> AppResult<String> {
    let base = if base.is_empty() { "product".to_string() } else { base.to_string() };
    let mut candidate = base.clone();
    loop {
        let mut finder = Products::find().filter(Column::Slug.eq(candidate.as_str()));
        if let Some(id) = exclude {
            finder = finder.filter(Column::Id.ne(id));
        }
        if finder.count(db).await? == 0 {
            return Ok(candidate);
        }
        let suffix = Uuid::new_v4().simple().to_string();
        candidate = format!("{base}-{}", &suffix[..6]);
    }
}

/// Ids of products with at least one sellable variant.
fn sellable_variant_products() -> SelectStatement {
    Query::select()
        .column(VariantCol::ProductId)
        .from(ProductVariants)
        .and_where(Expr::col(VariantCol::StockQuantity).gt(0))
        .and_where(Expr::col(VariantCol::IsAvailable).eq(true))
        .to_owned()
}

pub(crate) fn in_stock_condition(wanted: bool) -> Condition {
    if wanted {
        Condition::any()
            .add(Column::StockQuantity.gt(0))
            .add(Column::Id.in_subquery(sellable_variant_products()))
    } else {
        Condition::all()
            .add(Column::StockQuantity.lte(0))
            .add(Column::Id.not_in_subquery(sellable_variant_products()))
    }
}

pub(crate) fn summary_from_parts(
    model: ProductModel,
    category_label: Option<String>,
    primary_image: Option<String>,
    tags: Vec<String>,
    variants: &[VariantStock],
) -> ProductSummary {
    let image = primary_image
        .or_else(|| model.image_url.clone().filter(|u| !u.is_empty()))
        .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string());
    ProductSummary {
        id: model.id,
        is_in_stock: product_in_stock(model.stock_quantity, variants.iter().copied()),
        price_display: format_usd(model.price),
        title: model.title,
        slug: model.slug,
        price: model.price,
        description: model.description,
        image,
        category: model.category_key,
        category_label,
        stock_quantity: model.stock_quantity,
        is_active: model.is_active,
        is_featured: model.is_featured,
        tags,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

/// Load everything a listing needs for a page of products in a fixed number of queries.
pub(crate) async fn build_summaries<C: ConnectionTrait>(
    db: &C,
    products: Vec<ProductModel>,
) -> AppResult<Vec<ProductSummary>> {
    if products.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
    let keys: HashSet<String> = products.iter().map(|p| p.category_key.clone()).collect();

    let mut variants: HashMap<Uuid, Vec<VariantStock>> = HashMap::new();
    for v in ProductVariants::find()
        .filter(VariantCol::ProductId.is_in(ids.clone()))
        .all(db)
        .await?
    {
        variants.entry(v.product_id).or_default().push(VariantStock {
            stock_quantity: v.stock_quantity,
            is_available: v.is_available,
        });
    }

    let mut primary: HashMap<Uuid, String> = HashMap::new();
    for img in ProductImages::find()
        .filter(ImageCol::ProductId.is_in(ids.clone()))
        .filter(ImageCol::IsPrimary.eq(true))
        .order_by_asc(ImageCol::Position)
        .all(db)
        .await?
    {
        primary.entry(img.product_id).or_insert(img.url);
    }

    let labels: HashMap<String, String> = Categories::find()
        .filter(CategoryCol::Key.is_in(keys))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.key, c.label))
        .collect();

    let tags = tags_by_product(db, &ids).await?;

    Ok(products
        .into_iter()
        .map(|p| {
            let id = p.id;
            let label = labels.get(&p.category_key).cloned();
            summary_from_parts(
                p,
                label,
                primary.get(&id).cloned(),
                tags.get(&id).cloned().unwrap_or_default(),
                variants.get(&id).map(Vec::as_slice).unwrap_or(&[]),
            )
        })
        .collect())
}

async fn tags_by_product<C: ConnectionTrait>(
    db: &C,
    ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Vec<String>>> {
    let mut out: HashMap<Uuid, Vec<String>> = HashMap::new();
    let rows = ProductTagAssignments::find()
        .filter(AssignmentCol::ProductId.is_in(ids.to_vec()))
        .find_also_related(ProductTags)
        .order_by_asc(TagCol::Name)
        .all(db)
        .await?;
    for (assignment, tag) in rows {
        if let Some(tag) = tag {
            out.entry(assignment.product_id).or_default().push(tag.name);
        }
    }
    Ok(out)
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(Column::IsActive.eq(true));

    if let Some(category) = query.category.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(Column::CategoryKey.eq(category.as_str()));
    }

    if let Some(search) = query.search.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = contains_pattern(search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Title).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    if let Some(in_stock) = query.in_stock {
        condition = condition.add(in_stock_condition(in_stock));
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Title => Column::Title,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let products = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let items = build_summaries(&state.orm, products).await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn list_featured(state: &AppState) -> AppResult<ApiResponse<ProductList>> {
    let products = Products::find()
        .filter(Column::IsActive.eq(true))
        .filter(Column::IsFeatured.eq(true))
        .order_by_desc(Column::CreatedAt)
        .all(&state.orm)
        .await?;
    let items = build_summaries(&state.orm, products).await?;

    let meta = Meta::total(items.len() as i64);
    Ok(ApiResponse::success("Featured products", ProductList { items }, Some(meta)))
}

/// Active product by slug, or `NotFound`.
pub(crate) async fn find_active_by_slug<C: ConnectionTrait>(
    db: &C,
    slug: &str,
) -> AppResult<ProductModel> {
    Products::find()
        .filter(Column::Slug.eq(slug))
        .filter(Column::IsActive.eq(true))
        .one(db)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn get_product(state: &AppState, slug: &str) -> AppResult<ApiResponse<ProductDetail>> {
    let model = find_active_by_slug(&state.orm, slug).await?;
    let product_id = model.id;
    let price = model.price;

    let images: Vec<ProductImage> = ProductImages::find()
        .filter(ImageCol::ProductId.eq(product_id))
        .order_by_asc(ImageCol::Position)
        .order_by_asc(ImageCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(image_from_entity)
        .collect();

    let variants = variant_service::load_variants(&state.orm, &[(product_id, price)]).await?;
    let (available_sizes, available_colors) = variant_service::available_options(&variants);
    let rating = review_service::rating_for_product(&state.pool, product_id).await?;

    let mut summaries = build_summaries(&state.orm, vec![model]).await?;
    let product = summaries.pop().ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success(
        "Product",
        ProductDetail {
            product,
            images,
            variants,
            available_sizes,
            available_colors,
            rating,
        },
        Some(Meta::empty()),
    ))
}

pub async fn search(state: &AppState, q: Option<String>) -> AppResult<ApiResponse<SearchResults>> {
    let query = q.unwrap_or_default().trim().to_string();
    if query.is_empty() {
        return Ok(ApiResponse::success(
            "Search",
            SearchResults {
                results: Vec::new(),
                count: 0,
                query,
            },
            Some(Meta::total(0)),
        ));
    }

    let pattern = contains_pattern(&query);
    let products = Products::find()
        .filter(Column::IsActive.eq(true))
        .filter(
            Condition::any()
                .add(Expr::col(Column::Title).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern.clone()))
                .add(Expr::col(Column::CategoryKey).ilike(pattern)),
        )
        .order_by_asc(Column::Title)
        .limit(SEARCH_LIMIT)
        .all(&state.orm)
        .await?;
    let results = build_summaries(&state.orm, products).await?;
    let count = results.len() as i64;

    tracing::debug!(query = %query, count, "product search");

    Ok(ApiResponse::success(
        "Search",
        SearchResults {
            results,
            count,
            query,
        },
        Some(Meta::total(count)),
    ))
}

async fn ensure_category<C: ConnectionTrait>(db: &C, key: &str) -> AppResult<()> {
    let found = Categories::find()
        .filter(CategoryCol::Key.eq(key))
        .count(db)
        .await?;
    if found == 0 {
        return Err(AppError::BadRequest(format!("unknown category {key}")));
    }
    Ok(())
}

fn validate_price_and_stock(price: Option<i64>, stock: Option<i32>) -> AppResult<()> {
    if price.is_some_and(|p| p <= 0) {
        return Err(AppError::BadRequest("price must be greater than 0".into()));
    }
    if stock.is_some_and(|s| s < 0) {
        return Err(AppError::BadRequest("stock_quantity must not be negative".into()));
    }
    Ok(())
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<ProductSummary>> {
    ensure_admin(user)?;
    let title = payload.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::BadRequest("title must not be empty".into()));
    }
    validate_price_and_stock(Some(payload.price), Some(payload.stock_quantity))?;
    ensure_category(&state.orm, &payload.category).await?;

    let base = slugify(payload.slug.as_deref().unwrap_or(&title));
    let slug = unique_slug(&state.orm, &base, None).await?;

    let product = ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title),
        slug: Set(slug),
        price: Set(payload.price),
        description: Set(payload.description),
        image_url: Set(payload.image_url.filter(|u| !u.is_empty())),
        category_key: Set(payload.category),
        stock_quantity: Set(payload.stock_quantity),
        is_active: Set(payload.is_active),
        is_featured: Set(payload.is_featured),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(product_id = %product.id, slug = %product.slug, "product created");
    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    let mut items = build_summaries(&state.orm, vec![product]).await?;
    let data = items.pop().ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Product created", data, Some(Meta::empty())))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<ProductSummary>> {
    ensure_admin(user)?;
    validate_price_and_stock(payload.price, payload.stock_quantity)?;
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.into();
    if let Some(title) = payload.title {
        if title.trim().is_empty() {
            return Err(AppError::BadRequest("title must not be empty".into()));
        }
        active.title = Set(title.trim().to_string());
    }
    if let Some(slug) = payload.slug {
        let slug = unique_slug(&state.orm, &slugify(&slug), Some(id)).await?;
        active.slug = Set(slug);
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(image_url) = payload.image_url {
        active.image_url = Set(Some(image_url).filter(|u| !u.is_empty()));
    }
    if let Some(category) = payload.category {
        ensure_category(&state.orm, &category).await?;
        active.category_key = Set(category);
    }
    if let Some(stock) = payload.stock_quantity {
        active.stock_quantity = Set(stock);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    if let Some(is_featured) = payload.is_featured {
        active.is_featured = Set(is_featured);
    }
    active.updated_at = Set(Utc::now().into());

    let product = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    let mut items = build_summaries(&state.orm, vec![product]).await?;
    let data = items.pop().ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Updated", data, Some(Meta::empty())))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let ordered = OrderItems::find()
        .filter(OrderItemCol::ProductId.eq(id))
        .count(&state.orm)
        .await?;
    if ordered > 0 {
        return Err(AppError::Conflict(
            "product appears in orders, deactivate it instead".into(),
        ));
    }

    let result = Products::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn add_image(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: AddImageRequest,
) -> AppResult<ApiResponse<ProductImage>> {
    ensure_admin(user)?;
    if payload.url.trim().is_empty() {
        return Err(AppError::BadRequest("url must not be empty".into()));
    }
    Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let txn = state.orm.begin().await?;
    if payload.is_primary {
        ProductImages::update_many()
            .col_expr(ImageCol::IsPrimary, Expr::value(false))
            .filter(ImageCol::ProductId.eq(product_id))
            .exec(&txn)
            .await?;
    }
    let image = ImageActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        url: Set(payload.url.trim().to_string()),
        alt_text: Set(payload.alt_text),
        is_primary: Set(payload.is_primary),
        position: Set(payload.position),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_image_add",
        "product_images",
        serde_json::json!({ "product_id": product_id, "image_id": image.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Image added",
        image_from_entity(image),
        Some(Meta::empty()),
    ))
}

pub async fn delete_image(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = ProductImages::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_image_delete",
        "product_images",
        serde_json::json!({ "image_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

fn image_from_entity(model: ImageModel) -> ProductImage {
    ProductImage {
        id: model.id,
        url: model.url,
        alt_text: model.alt_text,
        is_primary: model.is_primary,
        position: model.position,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(stock: i32, image_url: Option<&str>) -> ProductModel {
        let now = Utc::now();
        ProductModel {
            id: Uuid::new_v4(),
            title: "Classic Tee".into(),
            slug: "classic-tee".into(),
            price: 2500,
            description: "Soft cotton".into(),
            image_url: image_url.map(str::to_string),
            category_key: "t-shirts".into(),
            stock_quantity: stock,
            is_active: true,
            is_featured: false,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[test]
    fn slugs_collapse_punctuation() {
        assert_eq!(slugify("Classic Tee"), "classic-tee");
        assert_eq!(slugify("  ENNC -- Hoodie (Black)!  "), "ennc-hoodie-black");
        assert_eq!(slugify("Café Mug"), "caf-mug");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn search_patterns_escape_wildcards() {
        assert_eq!(contains_pattern("tee"), "%tee%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(contains_pattern(r"a\b"), r"%a\\b%");
    }

    #[test]
    fn summary_prefers_primary_image_then_own_then_placeholder() {
        let s = summary_from_parts(model(1, Some("own.jpg")), None, Some("primary.jpg".into()), vec![], &[]);
        assert_eq!(s.image, "primary.jpg");

        let s = summary_from_parts(model(1, Some("own.jpg")), None, None, vec![], &[]);
        assert_eq!(s.image, "own.jpg");

        let s = summary_from_parts(model(1, None), None, None, vec![], &[]);
        assert_eq!(s.image, PLACEHOLDER_IMAGE);
    }

    #[test]
    fn summary_stock_includes_variants() {
        let variants = [VariantStock {
            stock_quantity: 3,
            is_available: true,
        }];
        let s = summary_from_parts(model(0, None), Some("T-Shirts".into()), None, vec![], &variants);
        assert!(s.is_in_stock);
        assert_eq!(s.price_display, "$25.00");
        assert_eq!(s.category_label.as_deref(), Some("T-Shirts"));

        let s = summary_from_parts(model(0, None), None, None, vec![], &[]);
        assert!(!s.is_in_stock);
    }
}
