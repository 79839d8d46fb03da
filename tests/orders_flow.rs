use sea_orm::{ActiveModelTrait, Set};
use storefront_api::{
    config::{AppConfig, PricingConfig},
    db::{create_pool, orm_from_pool, run_migrations},
    dto::{
        orders::{CreateOrderRequest, OrderLineRequest, UpdateOrderStatusRequest},
        reviews::CreateReviewRequest,
    },
    entity::product_sizes::ActiveModel as SizeActive,
    error::AppError,
    middleware::auth::AuthUser,
    models::OrderStatus,
    routes::params::{LowStockQuery, Pagination},
    services::{order_service, review_service, variant_service},
    state::AppState,
};
use uuid::Uuid;

struct Fixture {
    suffix: String,
    category_key: String,
    product_id: Uuid,
    slug: String,
    variant_id: Uuid,
    promo_code: String,
    admin: AuthUser,
}

// Guest checkout with a sized variant and a promo code, then fulfilment and review.
#[tokio::test]
async fn checkout_ship_and_review_flow() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };
    let fixture = seed_fixture(&state).await?;
    let email = format!("buyer-{}@example.com", short_id());
    let payment_reference = format!("pay_{}", Uuid::new_v4().simple());

    let mut request = order_request(
        &email,
        Some(payment_reference),
        vec![variant_line(&fixture, 2)],
    );
    request.promo_code = Some(fixture.promo_code.to_lowercase());

    let created = order_service::create_order(&state, request.clone())
        .await?
        .data
        .expect("order data");
    let order = created.order;
    // 2 x (2000 + 500) = 5000, 10% off, flat shipping, 5% tax on 4500.
    assert_eq!(order.subtotal, 5000);
    assert_eq!(order.discount_amount, 500);
    assert_eq!(order.shipping_cost, 999);
    assert_eq!(order.tax_amount, 225);
    assert_eq!(order.total, 5724);
    assert_eq!(order.status, OrderStatus::Processing);
    assert!(order.order_number.starts_with("ORD"));
    assert_eq!(created.items.len(), 1);
    assert_eq!(created.items[0].unit_price, 2500);

    assert_eq!(variant_stock(&state, fixture.variant_id).await?, 4);
    assert_eq!(promo_used_count(&state, &fixture.promo_code).await?, 1);

    // Replaying the same payment returns the original order untouched.
    let replay = order_service::create_order(&state, request).await?;
    assert_eq!(replay.message, "Order already created for this payment");
    assert_eq!(
        replay.data.expect("replay data").order.order_number,
        order.order_number
    );
    assert_eq!(variant_stock(&state, fixture.variant_id).await?, 4);
    assert_eq!(promo_used_count(&state, &fixture.promo_code).await?, 1);

    // Asking for more than remains fails without touching stock.
    let too_many = order_request(&email, None, vec![variant_line(&fixture, 10)]);
    match order_service::create_order(&state, too_many).await {
        Err(AppError::StockUnavailable(errors)) => assert_eq!(errors.len(), 1),
        other => panic!("expected stock error, got {:?}", other.map(|r| r.message)),
    }
    assert_eq!(variant_stock(&state, fixture.variant_id).await?, 4);

    // Lookup is case-insensitive on the order number.
    let fetched = order_service::get_order(&state, &order.order_number.to_lowercase())
        .await?
        .data
        .expect("lookup data");
    assert_eq!(fetched.order.id, order.id);

    let shipped = order_service::update_order_status(
        &state,
        &fixture.admin,
        &order.order_number,
        UpdateOrderStatusRequest {
            status: "shipped".into(),
            tracking_number: None,
            carrier: Some("DHL".into()),
        },
    )
    .await?
    .data
    .expect("shipped order");
    assert_eq!(shipped.status, OrderStatus::Shipped);
    let tracking = shipped.tracking_number.expect("tracking number");
    assert!(tracking.starts_with(&format!("ENT{}", order.order_number)));

    let low = variant_service::low_stock(
        &state,
        &fixture.admin,
        LowStockQuery { threshold: Some(5) },
    )
    .await?
    .data
    .expect("low stock data");
    assert!(
        low.variants.iter().any(|v| v.id == fixture.variant_id),
        "expected variant to appear in low-stock report"
    );

    let review = review_service::create(
        &state,
        &fixture.slug,
        CreateReviewRequest {
            user_name: "Ama".into(),
            user_email: email.to_uppercase(),
            rating: 5,
            title: "Great fit".into(),
            comment: "Fits true to size and washes well.".into(),
            size_purchased: Some("M".into()),
            color_purchased: None,
        },
    )
    .await?
    .data
    .expect("review data");
    assert!(review.verified_purchase);

    let listed = review_service::list_for_product(&state, &fixture.slug, Pagination::default())
        .await?
        .data
        .expect("review list");
    assert_eq!(listed.reviews.len(), 1);
    assert_eq!(listed.stats.total_reviews, 1);

    Ok(())
}

#[tokio::test]
async fn concurrent_checkouts_for_one_payment_create_one_order() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };
    let fixture = seed_fixture(&state).await?;
    let email = format!("buyer-{}@example.com", short_id());
    let request = order_request(
        &email,
        Some(format!("pay_{}", Uuid::new_v4().simple())),
        vec![variant_line(&fixture, 2)],
    );

    let (first, second) = tokio::join!(
        order_service::create_order(&state, request.clone()),
        order_service::create_order(&state, request.clone()),
    );
    let first = first?;
    let second = second?;

    let first_number = first.data.expect("first order").order.order_number;
    let second_number = second.data.expect("second order").order.order_number;
    assert_eq!(first_number, second_number);
    assert!(
        [first.message.as_str(), second.message.as_str()]
            .contains(&"Order already created for this payment"),
        "one of the two requests should replay the other"
    );
    assert_eq!(variant_stock(&state, fixture.variant_id).await?, 4);

    Ok(())
}

#[tokio::test]
async fn every_failing_line_is_reported() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };
    let fixture = seed_fixture(&state).await?;
    let sold_out = insert_product(&state, &fixture, "Sold Out Mug", 0).await?;

    let request = order_request(
        "buyer@example.com",
        None,
        vec![
            variant_line(&fixture, 7),
            OrderLineRequest {
                product_id: sold_out,
                variant_id: None,
                quantity: 1,
            },
        ],
    );
    match order_service::create_order(&state, request).await {
        Err(AppError::StockUnavailable(errors)) => {
            assert_eq!(errors.len(), 2, "{errors:?}");
            assert!(errors[0].contains("Only 6 in stock, but 7 requested"));
            assert_eq!(errors[1], "Sold Out Mug is out of stock");
        }
        other => panic!("expected stock error, got {:?}", other.map(|r| r.message)),
    }
    assert_eq!(variant_stock(&state, fixture.variant_id).await?, 6);

    Ok(())
}

#[tokio::test]
async fn repeated_lines_draw_from_the_same_stock() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };
    let fixture = seed_fixture(&state).await?;

    // Each line fits on its own; together they exceed the 6 units on hand.
    let request = order_request(
        "buyer@example.com",
        None,
        vec![variant_line(&fixture, 4), variant_line(&fixture, 4)],
    );
    match order_service::create_order(&state, request).await {
        Err(AppError::StockUnavailable(errors)) => {
            assert_eq!(errors.len(), 1, "{errors:?}");
            assert!(errors[0].contains("Only 2 in stock, but 4 requested"));
        }
        other => panic!("expected stock error, got {:?}", other.map(|r| r.message)),
    }
    assert_eq!(variant_stock(&state, fixture.variant_id).await?, 6);

    let request = order_request(
        "buyer@example.com",
        None,
        vec![variant_line(&fixture, 3), variant_line(&fixture, 3)],
    );
    order_service::create_order(&state, request).await?;
    assert_eq!(variant_stock(&state, fixture.variant_id).await?, 0);

    Ok(())
}

#[tokio::test]
async fn promo_usage_limit_is_enforced_at_checkout() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };
    let fixture = seed_fixture(&state).await?;
    let code = format!("ONCE{}", fixture.suffix.to_uppercase());
    sqlx::query(
        r#"
        INSERT INTO promo_codes (code, discount_type, discount_value, usage_limit, valid_from, valid_until)
        VALUES ($1, 'fixed', 500, 1, now() - interval '1 day', now() + interval '1 day')
        "#,
    )
    .bind(&code)
    .execute(&state.pool)
    .await?;

    let mut first = order_request("first@example.com", None, vec![variant_line(&fixture, 1)]);
    first.promo_code = Some(code.clone());
    let placed = order_service::create_order(&state, first)
        .await?
        .data
        .expect("first order");
    assert_eq!(placed.order.discount_amount, 500);

    let mut second = order_request("second@example.com", None, vec![variant_line(&fixture, 1)]);
    second.promo_code = Some(code.clone());
    match order_service::create_order(&state, second).await {
        Err(AppError::BadRequest(message)) => {
            assert_eq!(message, "This promo code has reached its usage limit")
        }
        other => panic!("expected usage limit error, got {:?}", other.map(|r| r.message)),
    }
    assert_eq!(promo_used_count(&state, &code).await?, 1);
    assert_eq!(variant_stock(&state, fixture.variant_id).await?, 5);

    Ok(())
}

#[tokio::test]
async fn unique_violations_map_to_conflict() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };
    let name = format!("XXL-{}", short_id());
    let size = || SizeActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.clone()),
        display_name: Set("Double XL".into()),
        position: Set(9),
    };

    size().insert(&state.orm).await?;
    let err = size()
        .insert(&state.orm)
        .await
        .expect_err("duplicate size name");
    let err = AppError::from(err);
    assert!(matches!(err, AppError::Conflict(_)), "{err:?}");
    assert_eq!(err.status(), axum::http::StatusCode::CONFLICT);

    let err = sqlx::query("INSERT INTO product_sizes (name, display_name) VALUES ($1, 'Again')")
        .bind(&name)
        .execute(&state.pool)
        .await
        .expect_err("duplicate size name");
    assert!(matches!(AppError::from(err), AppError::Conflict(_)));

    Ok(())
}

// Flow tests need Postgres; without a URL they print a notice and pass.
async fn test_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(None);
        }
    };

    let pool = create_pool(&database_url).await?;
    run_migrations(&orm_from_pool(&pool)).await?;

    let config = AppConfig {
        database_url,
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "test-secret".into(),
        cors_allowed_origins: Vec::new(),
        pricing: PricingConfig::default(),
        usd_to_ghs_rate: 12.5,
        reviews_auto_approve: true,
    };
    Ok(Some(AppState::new(pool, config)))
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

fn order_request(
    email: &str,
    payment_reference: Option<String>,
    items: Vec<OrderLineRequest>,
) -> CreateOrderRequest {
    CreateOrderRequest {
        customer_email: email.to_string(),
        customer_name: "Ama Mensah".into(),
        shipping_address: "12 Ring Road".into(),
        shipping_city: "Accra".into(),
        shipping_country: "Ghana".into(),
        shipping_postal_code: "GA-123".into(),
        payment_method: "card".into(),
        payment_reference,
        promo_code: None,
        items,
    }
}

fn variant_line(fixture: &Fixture, quantity: i32) -> OrderLineRequest {
    OrderLineRequest {
        product_id: fixture.product_id,
        variant_id: Some(fixture.variant_id),
        quantity,
    }
}

// Every key carries a random suffix so runs against a shared database don't collide.
async fn seed_fixture(state: &AppState) -> anyhow::Result<Fixture> {
    let suffix = short_id();

    let (admin_id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO users (email, password_hash, role) VALUES ($1, 'x', 'admin') RETURNING id",
    )
    .bind(format!("admin-{suffix}@example.com"))
    .fetch_one(&state.pool)
    .await?;

    let category_key = format!("flow-{suffix}");
    sqlx::query("INSERT INTO categories (key, label) VALUES ($1, 'Flow')")
        .bind(&category_key)
        .execute(&state.pool)
        .await?;

    let slug = format!("flow-tee-{suffix}");
    let (product_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO products (title, slug, price, category_key, stock_quantity)
        VALUES ('Flow Tee', $1, 2000, $2, 0)
        RETURNING id
        "#,
    )
    .bind(&slug)
    .bind(&category_key)
    .fetch_one(&state.pool)
    .await?;

    let (size_id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO product_sizes (name, display_name) VALUES ($1, 'Medium') RETURNING id",
    )
    .bind(format!("M-{suffix}"))
    .fetch_one(&state.pool)
    .await?;
    let (color_id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO product_colors (name, hex_code) VALUES ($1, '#000000') RETURNING id",
    )
    .bind(format!("Black-{suffix}"))
    .fetch_one(&state.pool)
    .await?;

    let (variant_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO product_variants (product_id, size_id, color_id, stock_quantity, price_adjustment)
        VALUES ($1, $2, $3, 6, 500)
        RETURNING id
        "#,
    )
    .bind(product_id)
    .bind(size_id)
    .bind(color_id)
    .fetch_one(&state.pool)
    .await?;

    let promo_code = format!("FLOW{}", suffix.to_uppercase());
    sqlx::query(
        r#"
        INSERT INTO promo_codes (code, discount_type, discount_value, valid_from, valid_until)
        VALUES ($1, 'percentage', 10, now() - interval '1 day', now() + interval '1 day')
        "#,
    )
    .bind(&promo_code)
    .execute(&state.pool)
    .await?;

    Ok(Fixture {
        suffix,
        category_key,
        product_id,
        slug,
        variant_id,
        promo_code,
        admin: AuthUser {
            user_id: admin_id,
            role: "admin".into(),
        },
    })
}

async fn insert_product(
    state: &AppState,
    fixture: &Fixture,
    title: &str,
    stock: i32,
) -> anyhow::Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO products (title, slug, price, category_key, stock_quantity)
        VALUES ($1, $2, 1200, $3, $4)
        RETURNING id
        "#,
    )
    .bind(title)
    .bind(format!("extra-{}", short_id()))
    .bind(&fixture.category_key)
    .bind(stock)
    .fetch_one(&state.pool)
    .await?;
    Ok(id)
}

async fn variant_stock(state: &AppState, variant_id: Uuid) -> anyhow::Result<i32> {
    let (stock,): (i32,) =
        sqlx::query_as("SELECT stock_quantity FROM product_variants WHERE id = $1")
            .bind(variant_id)
            .fetch_one(&state.pool)
            .await?;
    Ok(stock)
}

async fn promo_used_count(state: &AppState, code: &str) -> anyhow::Result<i32> {
    let (used,): (i32,) = sqlx::query_as("SELECT used_count FROM promo_codes WHERE code = $1")
        .bind(code)
        .fetch_one(&state.pool)
        .await?;
    Ok(used)
}
