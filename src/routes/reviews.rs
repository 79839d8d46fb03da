use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::reviews::{
        AdminReviewList, CreateReviewRequest, ModerateReviewRequest, ProductReviews,
        ReviewVoteRequest, ReviewVoteResult,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{AdminReview, Review},
    response::ApiResponse,
    routes::params::{AdminReviewQuery, Pagination},
    services::review_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/products/{slug}/reviews",
            get(list_reviews).post(create_review),
        )
        .route("/reviews/{id}/vote", post(vote_review))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/reviews", get(list_admin_reviews))
        .route("/reviews/{id}", patch(moderate_review).delete(delete_review))
}

#[utoipa::path(
    get,
    path = "/api/shop/products/{slug}/reviews",
    params(
        ("slug" = String, Path, description = "Product slug"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "Approved reviews with rating summary", body = ApiResponse<ProductReviews>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Reviews"
)]
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<ProductReviews>>> {
    let resp = review_service::list_for_product(&state, &slug, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/shop/products/{slug}/reviews",
    params(
        ("slug" = String, Path, description = "Product slug")
    ),
    request_body = CreateReviewRequest,
    responses(
        (status = 200, description = "Review submitted", body = ApiResponse<Review>),
        (status = 400, description = "Invalid review"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Email already reviewed this product"),
    ),
    tag = "Reviews"
)]
pub async fn create_review(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(payload): Json<CreateReviewRequest>,
) -> AppResult<Json<ApiResponse<Review>>> {
    let resp = review_service::create(&state, &slug, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/shop/reviews/{id}/vote",
    params(
        ("id" = Uuid, Path, description = "Review ID")
    ),
    request_body = ReviewVoteRequest,
    responses(
        (status = 200, description = "Vote recorded", body = ApiResponse<ReviewVoteResult>),
        (status = 404, description = "Review not found"),
    ),
    tag = "Reviews"
)]
pub async fn vote_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewVoteRequest>,
) -> AppResult<Json<ApiResponse<ReviewVoteResult>>> {
    let resp = review_service::vote(&state, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/reviews",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("approved" = Option<bool>, Query, description = "Filter by moderation state")
    ),
    responses(
        (status = 200, description = "All reviews", body = ApiResponse<AdminReviewList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_admin_reviews(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AdminReviewQuery>,
) -> AppResult<Json<ApiResponse<AdminReviewList>>> {
    let resp = review_service::list_admin(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/reviews/{id}",
    params(
        ("id" = Uuid, Path, description = "Review ID")
    ),
    request_body = ModerateReviewRequest,
    responses(
        (status = 200, description = "Review moderated", body = ApiResponse<AdminReview>),
        (status = 404, description = "Review not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn moderate_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ModerateReviewRequest>,
) -> AppResult<Json<ApiResponse<AdminReview>>> {
    let resp = review_service::moderate(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/reviews/{id}",
    params(
        ("id" = Uuid, Path, description = "Review ID")
    ),
    responses(
        (status = 200, description = "Review deleted"),
        (status = 404, description = "Review not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = review_service::delete(&state, &user, id).await?;
    Ok(Json(resp))
}
