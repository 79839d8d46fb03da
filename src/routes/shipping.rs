use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};

use crate::{
    dto::shipping::{ShippingStatus, ShippingUpdateRequest, ShippingUpdateResult},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::shipping_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/update", post(update_shipping))
        .route("/status/{order_number}", get(shipping_status))
}

#[utoipa::path(
    post,
    path = "/api/shipping/update",
    request_body = ShippingUpdateRequest,
    responses(
        (status = 200, description = "Shipping status updated", body = ApiResponse<ShippingUpdateResult>),
        (status = 400, description = "Invalid status"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Shipping"
)]
pub async fn update_shipping(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ShippingUpdateRequest>,
) -> AppResult<Json<ApiResponse<ShippingUpdateResult>>> {
    let resp = shipping_service::update_shipping(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/shipping/status/{order_number}",
    params(
        ("order_number" = String, Path, description = "Order number")
    ),
    responses(
        (status = 200, description = "Tracking progress", body = ApiResponse<ShippingStatus>),
        (status = 404, description = "Order not found"),
    ),
    tag = "Shipping"
)]
pub async fn shipping_status(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> AppResult<Json<ApiResponse<ShippingStatus>>> {
    let resp = shipping_service::shipping_status(&state, &order_number).await?;
    Ok(Json(resp))
}
