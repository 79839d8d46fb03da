use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{CreateOrderRequest, OrderList, OrderWithItems, UpdateOrderStatusRequest},
    entity::{
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        product_colors::{Column as ColorCol, Entity as ProductColors},
        product_sizes::{Column as SizeCol, Entity as ProductSizes},
        product_variants::{Column as VariantCol, Entity as ProductVariants, Model as VariantModel},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult, is_unique_violation},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderItem, OrderStatus},
    money::format_usd,
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::{
        pricing::compute_totals,
        promo_service,
        shipping_service::tracking_number,
        stock::{LineCheck, VariantStock, check_line, variant_final_price},
    },
    state::AppState,
};

/// Loose shape check: one `@`, a non-empty local part, a dotted domain, no spaces.
pub fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// `ORD` followed by the first 8 hex digits of the order id, upper-cased.
pub fn build_order_number(order_id: Uuid) -> String {
    let hex = order_id.simple().to_string();
    format!("ORD{}", hex[..8].to_uppercase())
}

pub fn variant_info(size: Option<&str>, color: Option<&str>) -> Option<String> {
    match (size, color) {
        (Some(s), Some(c)) => Some(format!("Size: {s}, Color: {c}")),
        (Some(s), None) => Some(format!("Size: {s}")),
        (None, Some(c)) => Some(format!("Color: {c}")),
        (None, None) => None,
    }
}

fn validate_order_request(payload: &CreateOrderRequest) -> Result<(), String> {
    let required = [
        ("customer_name", &payload.customer_name),
        ("shipping_address", &payload.shipping_address),
        ("shipping_city", &payload.shipping_city),
        ("shipping_country", &payload.shipping_country),
        ("payment_method", &payload.payment_method),
    ];
    if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
        return Err(format!("{field} is required"));
    }
    if !is_plausible_email(&payload.customer_email) {
        return Err("a valid customer_email is required".into());
    }
    if payload.items.is_empty() {
        return Err("order must contain at least one item".into());
    }
    if payload.items.iter().any(|i| i.quantity < 1) {
        return Err("item quantity must be at least 1".into());
    }
    Ok(())
}

/// A priced, stock-checked order line ready to insert.
struct PricedLine {
    product_id: Uuid,
    variant_id: Option<Uuid>,
    title: String,
    size: Option<String>,
    color: Option<String>,
    quantity: i32,
    unit_price: i64,
}

async fn find_by_payment_reference<C: ConnectionTrait>(
    db: &C,
    reference: &str,
) -> AppResult<Option<OrderModel>> {
    Ok(Orders::find()
        .filter(OrderCol::PaymentReference.eq(reference))
        .one(db)
        .await?)
}

async fn replay_existing(
    state: &AppState,
    existing: OrderModel,
) -> AppResult<ApiResponse<OrderWithItems>> {
    tracing::info!(
        order_number = %existing.order_number,
        "order already exists for payment reference"
    );
    let data = with_items(&state.orm, existing).await?;
    Ok(ApiResponse::success(
        "Order already created for this payment",
        data,
        Some(Meta::empty()),
    ))
}

async fn with_items<C: ConnectionTrait>(db: &C, order: OrderModel) -> AppResult<OrderWithItems> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(db)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();
    Ok(OrderWithItems {
        order: order_from_entity(order)?,
        items,
    })
}

pub async fn create_order(
    state: &AppState,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let payment_reference = payload
        .payment_reference
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string);

    if let Some(reference) = payment_reference.as_deref() {
        if let Some(existing) = find_by_payment_reference(&state.orm, reference).await? {
            return replay_existing(state, existing).await;
        }
    }

    validate_order_request(&payload).map_err(AppError::BadRequest)?;

    let txn = state.orm.begin().await?;

    let product_ids: HashSet<Uuid> = payload.items.iter().map(|i| i.product_id).collect();
    let products: HashMap<Uuid, _> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids.iter().copied()))
        .order_by_asc(ProdCol::Id)
        .lock(LockType::Update)
        .all(&txn)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let mut variants_by_product: HashMap<Uuid, Vec<VariantModel>> = HashMap::new();
    for v in ProductVariants::find()
        .filter(VariantCol::ProductId.is_in(product_ids.iter().copied()))
        .order_by_asc(VariantCol::Id)
        .lock(LockType::Update)
        .all(&txn)
        .await?
    {
        variants_by_product.entry(v.product_id).or_default().push(v);
    }

    // A concurrent request with the same payment may have committed while we waited on the locks.
    if let Some(reference) = payment_reference.as_deref() {
        if let Some(existing) = find_by_payment_reference(&txn, reference).await? {
            txn.rollback().await?;
            return replay_existing(state, existing).await;
        }
    }

    let size_ids: HashSet<Uuid> = variants_by_product.values().flatten().map(|v| v.size_id).collect();
    let color_ids: HashSet<Uuid> = variants_by_product.values().flatten().map(|v| v.color_id).collect();
    let size_names: HashMap<Uuid, String> = ProductSizes::find()
        .filter(SizeCol::Id.is_in(size_ids))
        .all(&txn)
        .await?
        .into_iter()
        .map(|s| (s.id, s.display_name))
        .collect();
    let color_names: HashMap<Uuid, String> = ProductColors::find()
        .filter(ColorCol::Id.is_in(color_ids))
        .all(&txn)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    // Quantities already claimed by earlier lines for the same product or variant.
    let mut claimed_products: HashMap<Uuid, i32> = HashMap::new();
    let mut claimed_variants: HashMap<Uuid, i32> = HashMap::new();
    let mut errors: Vec<String> = Vec::new();
    let mut lines: Vec<PricedLine> = Vec::with_capacity(payload.items.len());

    for item in &payload.items {
        let Some(product) = products.get(&item.product_id) else {
            errors.push(format!("Product with ID {} not found", item.product_id));
            continue;
        };
        let siblings = variants_by_product
            .get(&product.id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let stocks: Vec<VariantStock> = siblings
            .iter()
            .map(|v| VariantStock {
                stock_quantity: v.stock_quantity,
                is_available: v.is_available,
            })
            .collect();

        let variant = match item.variant_id {
            Some(variant_id) => match siblings.iter().find(|v| v.id == variant_id) {
                Some(v) => Some(v),
                None => {
                    errors.push(format!("{}: Selected variant not found", product.title));
                    continue;
                }
            },
            None => None,
        };

        let product_claimed = claimed_products.get(&product.id).copied().unwrap_or(0);
        let variant_stock = variant.map(|v| VariantStock {
            stock_quantity: v.stock_quantity - claimed_variants.get(&v.id).copied().unwrap_or(0),
            is_available: v.is_available,
        });
        let check = LineCheck {
            title: &product.title,
            is_active: product.is_active,
            product_stock: product.stock_quantity - product_claimed,
            product_variants: &stocks,
            variant: variant_stock,
            requested: item.quantity,
        };
        if let Some(message) = check_line(&check) {
            errors.push(message);
            continue;
        }

        let unit_price = match variant {
            Some(v) => {
                *claimed_variants.entry(v.id).or_default() += item.quantity;
                variant_final_price(product.price, v.price_adjustment)
            }
            None => {
                *claimed_products.entry(product.id).or_default() += item.quantity;
                product.price
            }
        };

        lines.push(PricedLine {
            product_id: product.id,
            variant_id: variant.map(|v| v.id),
            title: product.title.clone(),
            size: variant.and_then(|v| size_names.get(&v.size_id).cloned()),
            color: variant.and_then(|v| color_names.get(&v.color_id).cloned()),
            quantity: item.quantity,
            unit_price,
        });
    }

    if !errors.is_empty() {
        tracing::info!(errors = ?errors, "order rejected on stock validation");
        return Err(AppError::StockUnavailable(errors));
    }

    let subtotal: i64 = lines
        .iter()
        .map(|l| l.unit_price * l.quantity as i64)
        .sum();

    let promo = match payload
        .promo_code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
    {
        Some(code) => Some(promo_service::lock_for_order(&txn, code, subtotal).await?),
        None => None,
    };
    let (discount, free_shipping) = promo
        .as_ref()
        .map(|(_, quote)| (quote.discount_amount, quote.free_shipping))
        .unwrap_or((0, false));
    let totals = compute_totals(subtotal, discount, free_shipping, &state.config.pricing);

    let status = if payment_reference.is_some() {
        OrderStatus::Processing
    } else {
        OrderStatus::Pending
    };
    let order_id = Uuid::new_v4();
    let reference_for_replay = payment_reference.clone();

    let inserted = OrderActive {
        id: Set(order_id),
        order_number: Set(build_order_number(order_id)),
        customer_email: Set(payload.customer_email.trim().to_lowercase()),
        customer_name: Set(payload.customer_name.trim().to_string()),
        shipping_address: Set(payload.shipping_address.trim().to_string()),
        shipping_city: Set(payload.shipping_city.trim().to_string()),
        shipping_country: Set(payload.shipping_country.trim().to_string()),
        shipping_postal_code: Set(payload.shipping_postal_code.trim().to_string()),
        subtotal: Set(totals.subtotal),
        discount_amount: Set(totals.discount),
        promo_code: Set(promo.as_ref().map(|(p, _)| p.code.clone())),
        shipping_cost: Set(totals.shipping),
        tax_amount: Set(totals.tax),
        total: Set(totals.total),
        status: Set(status.as_str().to_string()),
        tracking_number: Set(None),
        carrier: Set(None),
        payment_method: Set(payload.payment_method.trim().to_string()),
        payment_reference: Set(payment_reference),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await;
    let order = match (inserted, reference_for_replay) {
        (Ok(order), _) => order,
        (Err(err), Some(reference)) if is_unique_violation(&err) => {
            txn.rollback().await?;
            let existing = find_by_payment_reference(&state.orm, &reference)
                .await?
                .ok_or(err)?;
            return replay_existing(state, existing).await;
        }
        (Err(err), _) => return Err(err.into()),
    };

    let mut items: Vec<OrderItem> = Vec::with_capacity(lines.len());
    for line in lines {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(line.product_id),
            variant_id: Set(line.variant_id),
            product_title: Set(line.title),
            selected_size: Set(line.size),
            selected_color: Set(line.color),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            total_price: Set(line.unit_price * line.quantity as i64),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
        items.push(order_item_from_entity(item));

        match line.variant_id {
            Some(variant_id) => {
                ProductVariants::update_many()
                    .col_expr(
                        VariantCol::StockQuantity,
                        Expr::col(VariantCol::StockQuantity).sub(line.quantity),
                    )
                    .filter(VariantCol::Id.eq(variant_id))
                    .exec(&txn)
                    .await?;
            }
            None => {
                Products::update_many()
                    .col_expr(
                        ProdCol::StockQuantity,
                        Expr::col(ProdCol::StockQuantity).sub(line.quantity),
                    )
                    .filter(ProdCol::Id.eq(line.product_id))
                    .exec(&txn)
                    .await?;
            }
        }
    }

    if let Some((promo, _)) = promo {
        promo_service::mark_used(&txn, promo).await?;
    }

    txn.commit().await?;

    tracing::info!(
        order_number = %order.order_number,
        total = order.total,
        items = items.len(),
        status = %status,
        "order placed"
    );
    audit::record(
        &state.pool,
        None,
        "order_create",
        "orders",
        serde_json::json!({ "order_id": order.id, "order_number": order.order_number }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order created",
        OrderWithItems {
            order: order_from_entity(order)?,
            items,
        },
        Some(Meta::empty()),
    ))
}

pub(crate) async fn find_by_number<C: ConnectionTrait>(
    db: &C,
    order_number: &str,
) -> AppResult<OrderModel> {
    Orders::find()
        .filter(OrderCol::OrderNumber.eq(order_number.trim().to_uppercase()))
        .one(db)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn get_order(
    state: &AppState,
    order_number: &str,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = find_by_number(&state.orm, order_number).await?;
    let data = with_items(&state.orm, order).await?;
    Ok(ApiResponse::success("OK", data, Some(Meta::empty())))
}

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status.as_deref().filter(|s| !s.is_empty()) {
        let status: OrderStatus = status.parse().map_err(AppError::BadRequest)?;
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    order_number: &str,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;
    let order = find_by_number(&state.orm, order_number).await?;
    let data = with_items(&state.orm, order).await?;
    Ok(ApiResponse::success("Order found", data, Some(Meta::empty())))
}

pub(crate) struct StatusChange {
    pub order: OrderModel,
    pub old_status: OrderStatus,
    pub new_status: OrderStatus,
}

/// Move an order to `status`, assigning a tracking number when it ships without one.
pub(crate) async fn change_status(
    state: &AppState,
    user: &AuthUser,
    order_number: &str,
    status: &str,
    tracking: Option<String>,
    carrier: Option<String>,
) -> AppResult<StatusChange> {
    ensure_admin(user)?;
    let new_status: OrderStatus = status.parse().map_err(AppError::BadRequest)?;

    let txn = state.orm.begin().await?;
    let existing = Orders::find()
        .filter(OrderCol::OrderNumber.eq(order_number.trim().to_uppercase()))
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    let old_status: OrderStatus = existing
        .status
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;

    let tracking = tracking.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    let tracking = match tracking {
        Some(t) => Some(t),
        None if new_status == OrderStatus::Shipped && existing.tracking_number.is_none() => {
            Some(tracking_number(&existing.order_number, Utc::now().date_naive()))
        }
        None => None,
    };

    let mut active: OrderActive = existing.into();
    active.status = Set(new_status.as_str().to_string());
    if let Some(t) = tracking {
        active.tracking_number = Set(Some(t));
    }
    if let Some(c) = carrier.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()) {
        active.carrier = Set(Some(c));
    }
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(
        order_number = %order.order_number,
        old_status = %old_status,
        new_status = %new_status,
        tracking_number = ?order.tracking_number,
        "order status changed"
    );
    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_status_update",
        "orders",
        serde_json::json!({
            "order_number": order.order_number,
            "old_status": old_status.as_str(),
            "new_status": new_status.as_str(),
        }),
    )
    .await;

    Ok(StatusChange {
        order,
        old_status,
        new_status,
    })
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    order_number: &str,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    let change = change_status(
        state,
        user,
        order_number,
        &payload.status,
        payload.tracking_number,
        payload.carrier,
    )
    .await?;

    Ok(ApiResponse::success(
        "Order updated",
        order_from_entity(change.order)?,
        Some(Meta::empty()),
    ))
}

pub(crate) fn order_from_entity(model: OrderModel) -> AppResult<Order> {
    let status: OrderStatus = model
        .status
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;
    Ok(Order {
        id: model.id,
        order_number: model.order_number,
        customer_email: model.customer_email,
        customer_name: model.customer_name,
        shipping_address: model.shipping_address,
        shipping_city: model.shipping_city,
        shipping_country: model.shipping_country,
        shipping_postal_code: model.shipping_postal_code,
        subtotal: model.subtotal,
        discount_amount: model.discount_amount,
        promo_code: model.promo_code,
        shipping_cost: model.shipping_cost,
        tax_amount: model.tax_amount,
        total: model.total,
        total_display: format_usd(model.total),
        status,
        status_display: status.display_name().to_string(),
        tracking_number: model.tracking_number,
        carrier: model.carrier,
        payment_method: model.payment_method,
        payment_reference: model.payment_reference,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        product_id: model.product_id,
        variant_id: model.variant_id,
        variant_info: variant_info(model.selected_size.as_deref(), model.selected_color.as_deref()),
        product_title: model.product_title,
        selected_size: model.selected_size,
        selected_color: model.selected_color,
        quantity: model.quantity,
        unit_price: model.unit_price,
        total_price: model.total_price,
        total_display: format_usd(model.total_price),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::orders::OrderLineRequest;

    fn request() -> CreateOrderRequest {
        CreateOrderRequest {
            customer_email: "ama@example.com".into(),
            customer_name: "Ama Mensah".into(),
            shipping_address: "12 Ring Road".into(),
            shipping_city: "Accra".into(),
            shipping_country: "Ghana".into(),
            shipping_postal_code: String::new(),
            payment_method: "card".into(),
            payment_reference: None,
            promo_code: None,
            items: vec![OrderLineRequest {
                product_id: Uuid::new_v4(),
                variant_id: None,
                quantity: 1,
            }],
        }
    }

    #[test]
    fn order_numbers_are_prefixed_upper_hex() {
        let id = Uuid::parse_str("3f2a9c1e-0000-4000-8000-000000000000").unwrap();
        assert_eq!(build_order_number(id), "ORD3F2A9C1E");
        assert_eq!(build_order_number(Uuid::new_v4()).len(), 11);
    }

    #[test]
    fn email_shapes() {
        assert!(is_plausible_email("ama@example.com"));
        assert!(is_plausible_email(" a.b@shop.co.uk "));
        assert!(!is_plausible_email("ama"));
        assert!(!is_plausible_email("@example.com"));
        assert!(!is_plausible_email("ama@localhost"));
        assert!(!is_plausible_email("ama@ex ample.com"));
        assert!(!is_plausible_email("a@b@c.com"));
    }

    #[test]
    fn variant_info_labels() {
        assert_eq!(
            variant_info(Some("M"), Some("Red")).as_deref(),
            Some("Size: M, Color: Red")
        );
        assert_eq!(variant_info(Some("M"), None).as_deref(), Some("Size: M"));
        assert_eq!(variant_info(None, None), None);
    }

    #[test]
    fn order_request_validation() {
        assert!(validate_order_request(&request()).is_ok());

        let mut missing_city = request();
        missing_city.shipping_city = "  ".into();
        assert_eq!(
            validate_order_request(&missing_city).unwrap_err(),
            "shipping_city is required"
        );

        let mut empty = request();
        empty.items.clear();
        assert!(validate_order_request(&empty).is_err());

        let mut zero = request();
        zero.items[0].quantity = 0;
        assert!(validate_order_request(&zero).is_err());

        let mut bad_email = request();
        bad_email.customer_email = "nope".into();
        assert!(validate_order_request(&bad_email).is_err());
    }
}
