use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{AdminReview, RatingStats, Review};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReviewRequest {
    pub user_name: String,
    pub user_email: String,
    pub rating: i16,
    pub title: String,
    pub comment: String,
    pub size_purchased: Option<String>,
    pub color_purchased: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductReviews {
    pub reviews: Vec<Review>,
    pub stats: RatingStats,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewVoteRequest {
    pub helpful: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewVoteResult {
    pub helpful_count: i32,
    pub not_helpful_count: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ModerateReviewRequest {
    pub is_approved: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct AdminReviewList {
    #[schema(value_type = Vec<AdminReview>)]
    pub items: Vec<AdminReview>,
}
