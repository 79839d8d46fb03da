use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::promo_codes::{
        CreatePromoRequest, PromoList, PromoValidation, PublicPromoList, UpdatePromoRequest,
        ValidatePromoRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::PromoCode,
    response::ApiResponse,
    services::promo_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/promo-codes", get(list_public_codes))
        .route("/validate-promo-code", post(validate_code))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/promo-codes", get(list_codes).post(create_code))
        .route("/promo-codes/{id}", put(update_code).delete(delete_code))
}

#[utoipa::path(
    get,
    path = "/api/shop/promo-codes",
    responses(
        (status = 200, description = "Codes currently usable", body = ApiResponse<PublicPromoList>)
    ),
    tag = "Promo codes"
)]
pub async fn list_public_codes(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<PublicPromoList>>> {
    let resp = promo_service::list_public(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/shop/validate-promo-code",
    request_body = ValidatePromoRequest,
    responses(
        (status = 200, description = "Code applies to the subtotal", body = ApiResponse<PromoValidation>),
        (status = 400, description = "Code does not apply"),
        (status = 404, description = "Unknown code"),
    ),
    tag = "Promo codes"
)]
pub async fn validate_code(
    State(state): State<AppState>,
    Json(payload): Json<ValidatePromoRequest>,
) -> AppResult<Json<ApiResponse<PromoValidation>>> {
    let resp = promo_service::validate(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/promo-codes",
    responses(
        (status = 200, description = "All promo codes", body = ApiResponse<PromoList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_codes(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<PromoList>>> {
    let resp = promo_service::list_all(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/promo-codes",
    request_body = CreatePromoRequest,
    responses(
        (status = 200, description = "Create promo code", body = ApiResponse<PromoCode>),
        (status = 400, description = "Invalid terms"),
        (status = 409, description = "Code already exists"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_code(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreatePromoRequest>,
) -> AppResult<Json<ApiResponse<PromoCode>>> {
    let resp = promo_service::create(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/promo-codes/{id}",
    params(
        ("id" = Uuid, Path, description = "Promo code ID")
    ),
    request_body = UpdatePromoRequest,
    responses(
        (status = 200, description = "Update promo code", body = ApiResponse<PromoCode>),
        (status = 404, description = "Promo code not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_code(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePromoRequest>,
) -> AppResult<Json<ApiResponse<PromoCode>>> {
    let resp = promo_service::update(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/promo-codes/{id}",
    params(
        ("id" = Uuid, Path, description = "Promo code ID")
    ),
    responses(
        (status = 200, description = "Delete promo code"),
        (status = 404, description = "Promo code not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_code(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = promo_service::delete(&state, &user, id).await?;
    Ok(Json(resp))
}
