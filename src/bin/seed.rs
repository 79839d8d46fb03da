use chrono::{Duration, Utc};
use storefront_api::{
    config::AppConfig,
    db::{create_pool, orm_from_pool, run_migrations},
    services::auth_service::hash_password,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&orm_from_pool(&pool)).await?;

    let admin_email = std::env::var("SEED_ADMIN_EMAIL").unwrap_or_else(|_| "admin@example.com".into());
    let admin_password = std::env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".into());
    let admin_id = ensure_staff(&pool, &admin_email, &admin_password, "admin").await?;

    seed_categories(&pool).await?;
    seed_sizes_and_colors(&pool).await?;
    seed_tags(&pool).await?;
    seed_products(&pool).await?;
    seed_promo_codes(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}");
    Ok(())
}

async fn ensure_staff(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_optional(pool)
    .await?;

    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured staff account {email} (role={role})");
    Ok(user_id)
}

async fn seed_categories(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let categories = [
        ("tshirts", "T-Shirts", "Everyday cotton tees", true),
        ("hoodies", "Hoodies", "Heavyweight fleece for cold evenings", true),
        ("caps", "Caps", "Embroidered caps and beanies", false),
        ("accessories", "Accessories", "Bags, socks and small goods", false),
    ];

    for (key, label, description, featured) in categories {
        sqlx::query(
            r#"
            INSERT INTO categories (key, label, description, featured)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (key) DO NOTHING
            "#,
        )
        .bind(key)
        .bind(label)
        .bind(description)
        .bind(featured)
        .execute(pool)
        .await?;
    }

    println!("Seeded categories");
    Ok(())
}

async fn seed_sizes_and_colors(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let sizes = [("XS", "Extra Small"), ("S", "Small"), ("M", "Medium"), ("L", "Large"), ("XL", "Extra Large")];
    for (position, (name, display_name)) in sizes.into_iter().enumerate() {
        sqlx::query(
            "INSERT INTO product_sizes (name, display_name, position) VALUES ($1, $2, $3) ON CONFLICT (name) DO NOTHING",
        )
        .bind(name)
        .bind(display_name)
        .bind(position as i32)
        .execute(pool)
        .await?;
    }

    let colors = [
        ("Black", "#000000"),
        ("White", "#FFFFFF"),
        ("Navy", "#1E3A8A"),
        ("Forest", "#166534"),
    ];
    for (position, (name, hex_code)) in colors.into_iter().enumerate() {
        sqlx::query(
            "INSERT INTO product_colors (name, hex_code, position) VALUES ($1, $2, $3) ON CONFLICT (name) DO NOTHING",
        )
        .bind(name)
        .bind(hex_code)
        .bind(position as i32)
        .execute(pool)
        .await?;
    }

    println!("Seeded sizes and colors");
    Ok(())
}

async fn seed_tags(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let tags = [
        ("new", "New Arrival", "#10B981"),
        ("bestseller", "Bestseller", "#F59E0B"),
        ("limited", "Limited Edition", "#EF4444"),
    ];
    for (name, display_name, color) in tags {
        sqlx::query(
            "INSERT INTO product_tags (name, display_name, color) VALUES ($1, $2, $3) ON CONFLICT (name) DO NOTHING",
        )
        .bind(name)
        .bind(display_name)
        .bind(color)
        .execute(pool)
        .await?;
    }

    println!("Seeded tags");
    Ok(())
}

struct SeedProduct {
    title: &'static str,
    slug: &'static str,
    price: i64,
    description: &'static str,
    category_key: &'static str,
    stock: i32,
    featured: bool,
    sized: bool,
    tags: &'static [&'static str],
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let products = [
        SeedProduct {
            title: "Classic Logo Tee",
            slug: "classic-logo-tee",
            price: 2500,
            description: "Soft ringspun cotton with a printed chest logo",
            category_key: "tshirts",
            stock: 0,
            featured: true,
            sized: true,
            tags: &["bestseller"],
        },
        SeedProduct {
            title: "Midnight Hoodie",
            slug: "midnight-hoodie",
            price: 6500,
            description: "Brushed fleece hoodie with kangaroo pocket",
            category_key: "hoodies",
            stock: 0,
            featured: true,
            sized: true,
            tags: &["new"],
        },
        SeedProduct {
            title: "Embroidered Dad Cap",
            slug: "embroidered-dad-cap",
            price: 1800,
            description: "Adjustable strap, low profile",
            category_key: "caps",
            stock: 40,
            featured: false,
            sized: false,
            tags: &[],
        },
        SeedProduct {
            title: "Canvas Tote",
            slug: "canvas-tote",
            price: 1500,
            description: "Heavy canvas tote with inner pocket",
            category_key: "accessories",
            stock: 3,
            featured: false,
            sized: false,
            tags: &["limited"],
        },
    ];

    for product in &products {
        let row: Option<(Uuid,)> = sqlx::query_as(
            r#"
            INSERT INTO products (title, slug, price, description, category_key, stock_quantity, is_featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (slug) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(product.title)
        .bind(product.slug)
        .bind(product.price)
        .bind(product.description)
        .bind(product.category_key)
        .bind(product.stock)
        .bind(product.featured)
        .fetch_optional(pool)
        .await?;

        // Existing products keep whatever variants and tags staff gave them.
        let Some((product_id,)) = row else {
            continue;
        };

        sqlx::query(
            "INSERT INTO product_images (product_id, url, alt_text, is_primary) VALUES ($1, $2, $3, TRUE)",
        )
        .bind(product_id)
        .bind(format!("/images/products/{}.jpg", product.slug))
        .bind(product.title)
        .execute(pool)
        .await?;

        if product.sized {
            sqlx::query(
                r#"
                INSERT INTO product_variants (product_id, size_id, color_id, stock_quantity, price_adjustment)
                SELECT $1, s.id, c.id, 10,
                       CASE WHEN s.name = 'XL' THEN 200 ELSE 0 END
                FROM product_sizes s
                CROSS JOIN product_colors c
                WHERE s.name IN ('S', 'M', 'L', 'XL') AND c.name IN ('Black', 'White')
                ON CONFLICT (product_id, size_id, color_id) DO NOTHING
                "#,
            )
            .bind(product_id)
            .execute(pool)
            .await?;
        }

        for tag in product.tags {
            sqlx::query(
                r#"
                INSERT INTO product_tag_assignments (product_id, tag_id)
                SELECT $1, id FROM product_tags WHERE name = $2
                ON CONFLICT (product_id, tag_id) DO NOTHING
                "#,
            )
            .bind(product_id)
            .bind(tag)
            .execute(pool)
            .await?;
        }
    }

    println!("Seeded products");
    Ok(())
}

async fn seed_promo_codes(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let now = Utc::now();
    let year = Duration::days(365);
    // (code, description, type, value, minimum, maximum, usage limit, from, until)
    let codes = [
        ("ENNC10", "10% off your order", "percentage", 10_i64, 0_i64, None, None, now, now + year),
        ("WELCOME20", "20% off orders over $50", "percentage", 20, 5000, Some(2000_i64), None, now, now + year),
        ("SAVE15", "$15 off orders over $75", "fixed", 1500, 7500, None, Some(500_i32), now, now + year),
        ("FREESHIP", "Free shipping on any order", "free_shipping", 0, 0, None, None, now, now + year),
        ("SUMMER25", "25% off summer styles", "percentage", 25, 4000, Some(3000), Some(100), now, now + Duration::days(90)),
        ("EXPIRED10", "Expired test code", "percentage", 10, 0, None, None, now - year, now - Duration::days(1)),
    ];

    for (code, description, kind, value, minimum, maximum, limit, from, until) in codes {
        sqlx::query(
            r#"
            INSERT INTO promo_codes (code, description, discount_type, discount_value,
                minimum_order_amount, maximum_discount_amount, usage_limit, valid_from, valid_until)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (code) DO NOTHING
            "#,
        )
        .bind(code)
        .bind(description)
        .bind(kind)
        .bind(value)
        .bind(minimum)
        .bind(maximum)
        .bind(limit)
        .bind(from)
        .bind(until)
        .execute(pool)
        .await?;
    }

    println!("Seeded promo codes");
    Ok(())
}
