use std::collections::BTreeMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    audit,
    db::DbPool,
    dto::reviews::{
        AdminReviewList, CreateReviewRequest, ModerateReviewRequest,
        ProductReviews as ProductReviewsDto,
        ReviewVoteRequest, ReviewVoteResult,
    },
    entity::product_reviews::{ActiveModel, Column, Entity as ProductReviews, Model as ReviewModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{AdminReview, OrderStatus, RatingStats, Review},
    response::{ApiResponse, Meta},
    routes::params::{AdminReviewQuery, Pagination},
    services::{order_service::is_plausible_email, product_service::find_active_by_slug},
    state::AppState,
};

/// Summarize `(rating, count)` pairs; every star value 1..=5 is present in the distribution.
pub fn rating_stats(counts: &[(i16, i64)]) -> RatingStats {
    let mut distribution: BTreeMap<i16, i64> = (1..=5).map(|r| (r, 0)).collect();
    let mut total = 0_i64;
    let mut sum = 0_i64;
    for &(rating, count) in counts {
        if let Some(slot) = distribution.get_mut(&rating) {
            *slot += count;
            total += count;
            sum += rating as i64 * count;
        }
    }
    let average = if total == 0 {
        0.0
    } else {
        (sum as f64 / total as f64 * 10.0).round() / 10.0
    };
    RatingStats {
        average_rating: average,
        total_reviews: total,
        rating_distribution: distribution,
    }
}

pub(crate) async fn rating_for_product(pool: &DbPool, product_id: Uuid) -> AppResult<RatingStats> {
    let counts: Vec<(i16, i64)> = sqlx::query_as(
        r#"
        SELECT rating, COUNT(*)
        FROM product_reviews
        WHERE product_id = $1 AND is_approved
        GROUP BY rating
        "#,
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;
    Ok(rating_stats(&counts))
}

async fn has_purchased(pool: &DbPool, product_id: Uuid, email: &str) -> AppResult<bool> {
    let (found,): (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS (
            SELECT 1
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            WHERE oi.product_id = $1
              AND lower(o.customer_email) = $2
              AND o.status <> $3
        )
        "#,
    )
    .bind(product_id)
    .bind(email)
    .bind(OrderStatus::Cancelled.as_str())
    .fetch_one(pool)
    .await?;
    Ok(found)
}

pub async fn list_for_product(
    state: &AppState,
    slug: &str,
    pagination: Pagination,
) -> AppResult<ApiResponse<ProductReviewsDto>> {
    let product = find_active_by_slug(&state.orm, slug).await?;
    let (page, limit, offset) = pagination.normalize();

    let finder = ProductReviews::find()
        .filter(Column::ProductId.eq(product.id))
        .filter(Column::IsApproved.eq(true))
        .order_by_desc(Column::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let reviews = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(review_from_entity)
        .collect();
    let stats = rating_for_product(&state.pool, product.id).await?;

    Ok(ApiResponse::success(
        "Reviews",
        ProductReviewsDto { reviews, stats },
        Some(Meta::new(page, limit, total)),
    ))
}

fn validate_review(payload: &CreateReviewRequest) -> AppResult<()> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::BadRequest("rating must be between 1 and 5".into()));
    }
    if payload.user_name.trim().is_empty()
        || payload.title.trim().is_empty()
        || payload.comment.trim().is_empty()
    {
        return Err(AppError::BadRequest(
            "user_name, title and comment are required".into(),
        ));
    }
    if !is_plausible_email(&payload.user_email) {
        return Err(AppError::BadRequest("a valid email is required".into()));
    }
    Ok(())
}

pub async fn create(
    state: &AppState,
    slug: &str,
    payload: CreateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    validate_review(&payload)?;
    let product = find_active_by_slug(&state.orm, slug).await?;
    let email = payload.user_email.trim().to_lowercase();

    let existing = ProductReviews::find()
        .filter(Column::ProductId.eq(product.id))
        .filter(Column::UserEmail.eq(email.as_str()))
        .count(&state.orm)
        .await?;
    if existing > 0 {
        return Err(AppError::Conflict(
            "You have already reviewed this product".into(),
        ));
    }

    let verified = has_purchased(&state.pool, product.id, &email).await?;
    let review = ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product.id),
        user_name: Set(payload.user_name.trim().to_string()),
        user_email: Set(email),
        rating: Set(payload.rating),
        title: Set(payload.title.trim().to_string()),
        comment: Set(payload.comment.trim().to_string()),
        size_purchased: Set(payload.size_purchased.filter(|s| !s.is_empty())),
        color_purchased: Set(payload.color_purchased.filter(|s| !s.is_empty())),
        verified_purchase: Set(verified),
        is_approved: Set(state.config.reviews_auto_approve),
        helpful_count: Set(0),
        not_helpful_count: Set(0),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(
        product_id = %product.id,
        review_id = %review.id,
        rating = review.rating,
        verified,
        "review submitted"
    );

    let message = if review.is_approved {
        "Review submitted"
    } else {
        "Review submitted and awaiting moderation"
    };
    Ok(ApiResponse::success(
        message,
        review_from_entity(review),
        Some(Meta::empty()),
    ))
}

pub async fn vote(
    state: &AppState,
    id: Uuid,
    payload: ReviewVoteRequest,
) -> AppResult<ApiResponse<ReviewVoteResult>> {
    let sql = if payload.helpful {
        "UPDATE product_reviews SET helpful_count = helpful_count + 1 \
         WHERE id = $1 AND is_approved RETURNING helpful_count, not_helpful_count"
    } else {
        "UPDATE product_reviews SET not_helpful_count = not_helpful_count + 1 \
         WHERE id = $1 AND is_approved RETURNING helpful_count, not_helpful_count"
    };
    let counts: Option<(i32, i32)> = sqlx::query_as(sql)
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    let (helpful_count, not_helpful_count) = counts.ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success(
        "Vote recorded",
        ReviewVoteResult {
            helpful_count,
            not_helpful_count,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_admin(
    state: &AppState,
    user: &AuthUser,
    query: AdminReviewQuery,
) -> AppResult<ApiResponse<AdminReviewList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(approved) = query.approved {
        condition = condition.add(Column::IsApproved.eq(approved));
    }
    let finder = ProductReviews::find()
        .filter(condition)
        .order_by_desc(Column::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(admin_review_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Reviews",
        AdminReviewList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn moderate(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: ModerateReviewRequest,
) -> AppResult<ApiResponse<AdminReview>> {
    ensure_admin(user)?;
    let existing = ProductReviews::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.into();
    active.is_approved = Set(payload.is_approved);
    let review = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "review_moderate",
        "product_reviews",
        serde_json::json!({ "review_id": id, "is_approved": payload.is_approved }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        admin_review_from_entity(review),
        Some(Meta::empty()),
    ))
}

pub async fn delete(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = ProductReviews::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "review_delete",
        "product_reviews",
        serde_json::json!({ "review_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

fn review_from_entity(model: ReviewModel) -> Review {
    Review {
        id: model.id,
        product_id: model.product_id,
        user_name: model.user_name,
        rating: model.rating,
        title: model.title,
        comment: model.comment,
        size_purchased: model.size_purchased,
        color_purchased: model.color_purchased,
        verified_purchase: model.verified_purchase,
        helpful_count: model.helpful_count,
        not_helpful_count: model.not_helpful_count,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn admin_review_from_entity(model: ReviewModel) -> AdminReview {
    let user_email = model.user_email.clone();
    let is_approved = model.is_approved;
    AdminReview {
        review: review_from_entity(model),
        user_email,
        is_approved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_reviews_have_zeroed_distribution() {
        let stats = rating_stats(&[]);
        assert_eq!(stats.total_reviews, 0);
        assert_eq!(stats.average_rating, 0.0);
        assert_eq!(stats.rating_distribution.len(), 5);
        assert!(stats.rating_distribution.values().all(|&c| c == 0));
    }

    #[test]
    fn average_is_rounded_to_one_decimal() {
        let stats = rating_stats(&[(5, 2), (4, 1)]);
        assert_eq!(stats.total_reviews, 3);
        assert_eq!(stats.average_rating, 4.7);
        assert_eq!(stats.rating_distribution[&5], 2);
        assert_eq!(stats.rating_distribution[&4], 1);
        assert_eq!(stats.rating_distribution[&1], 0);
    }

    #[test]
    fn out_of_range_ratings_are_ignored() {
        let stats = rating_stats(&[(3, 1), (9, 4)]);
        assert_eq!(stats.total_reviews, 1);
        assert_eq!(stats.average_rating, 3.0);
    }
}
