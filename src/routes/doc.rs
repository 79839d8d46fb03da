use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse},
        catalog::{
            CategoryList, CreateCategoryRequest, CreateTagRequest, SetProductTagsRequest,
            ShopStats, TagList, UpdateCategoryRequest,
        },
        orders::{
            CreateOrderRequest, OrderLineRequest, OrderList, OrderWithItems,
            UpdateOrderStatusRequest,
        },
        products::{
            AddImageRequest, CreateProductRequest, ImageList, ProductList, SearchResults,
            UpdateProductRequest,
        },
        promo_codes::{
            CreatePromoRequest, PromoList, PromoValidation, PublicPromoList, UpdatePromoRequest,
            ValidatePromoRequest,
        },
        reviews::{
            AdminReviewList, CreateReviewRequest, ModerateReviewRequest, ProductReviews,
            ReviewVoteRequest, ReviewVoteResult,
        },
        shipping::{
            ShippingAddress, ShippingStatus, ShippingUpdateRequest, ShippingUpdateResult,
            TrackingStep,
        },
        variants::{
            ColorList, CreateColorRequest, CreateSizeRequest, CreateVariantRequest,
            InventoryAdjustRequest, LowStockReport, SizeList, UpdateVariantRequest,
        },
    },
    models::{
        AdminReview, Category, DiscountType, Order, OrderItem, OrderStatus, ProductColor,
        ProductDetail, ProductImage, ProductSize, ProductSummary, ProductVariant, PromoCode,
        PublicPromoCode, RatingStats, Review, Tag,
    },
    money::GhsConversion,
    response::{ApiResponse, Meta},
    routes::{admin, auth, catalog, health, orders, params, products, promo_codes, reviews, shipping},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        catalog::list_categories,
        catalog::list_featured_categories,
        catalog::list_tags,
        catalog::shop_stats,
        catalog::exchange_rate,
        catalog::create_category,
        catalog::update_category,
        catalog::delete_category,
        catalog::create_tag,
        catalog::set_product_tags,
        products::list_products,
        products::list_featured,
        products::get_product,
        products::search_products,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::add_image,
        products::delete_image,
        reviews::list_reviews,
        reviews::create_review,
        reviews::vote_review,
        reviews::list_admin_reviews,
        reviews::moderate_review,
        reviews::delete_review,
        promo_codes::list_public_codes,
        promo_codes::validate_code,
        promo_codes::list_codes,
        promo_codes::create_code,
        promo_codes::update_code,
        promo_codes::delete_code,
        orders::create_order,
        orders::get_order,
        orders::list_all_orders,
        orders::get_order_admin,
        orders::update_order_status,
        shipping::update_shipping,
        shipping::shipping_status,
        admin::list_sizes,
        admin::create_size,
        admin::list_colors,
        admin::create_color,
        admin::create_variant,
        admin::update_variant,
        admin::delete_variant,
        admin::list_low_stock,
        admin::adjust_product_stock,
        admin::adjust_variant_stock
    ),
    components(
        schemas(
            Category,
            Tag,
            ProductSummary,
            ProductDetail,
            ProductImage,
            ProductSize,
            ProductColor,
            ProductVariant,
            RatingStats,
            Review,
            AdminReview,
            PromoCode,
            PublicPromoCode,
            DiscountType,
            Order,
            OrderItem,
            OrderStatus,
            GhsConversion,
            LoginRequest,
            LoginResponse,
            CategoryList,
            CreateCategoryRequest,
            UpdateCategoryRequest,
            CreateTagRequest,
            SetProductTagsRequest,
            TagList,
            ShopStats,
            ProductList,
            SearchResults,
            CreateProductRequest,
            UpdateProductRequest,
            AddImageRequest,
            ImageList,
            SizeList,
            ColorList,
            CreateSizeRequest,
            CreateColorRequest,
            CreateVariantRequest,
            UpdateVariantRequest,
            InventoryAdjustRequest,
            LowStockReport,
            ProductReviews,
            CreateReviewRequest,
            ReviewVoteRequest,
            ReviewVoteResult,
            ModerateReviewRequest,
            AdminReviewList,
            ValidatePromoRequest,
            PromoValidation,
            CreatePromoRequest,
            UpdatePromoRequest,
            PromoList,
            PublicPromoList,
            CreateOrderRequest,
            OrderLineRequest,
            OrderWithItems,
            OrderList,
            UpdateOrderStatusRequest,
            ShippingUpdateRequest,
            ShippingUpdateResult,
            ShippingStatus,
            ShippingAddress,
            TrackingStep,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<ProductList>,
            ApiResponse<ProductDetail>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<PromoValidation>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Staff login"),
        (name = "Catalog", description = "Categories, tags and storefront stats"),
        (name = "Products", description = "Product browsing and search"),
        (name = "Reviews", description = "Product reviews"),
        (name = "Promo codes", description = "Discount codes"),
        (name = "Orders", description = "Guest checkout and order lookup"),
        (name = "Shipping", description = "Shipping status and tracking"),
        (name = "Admin", description = "Staff-only endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
