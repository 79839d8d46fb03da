use chrono::{NaiveDate, Utc};

use crate::{
    dto::shipping::{
        ShippingAddress, ShippingStatus, ShippingUpdateRequest, ShippingUpdateResult, TrackingStep,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::OrderStatus,
    response::{ApiResponse, Meta},
    services::order_service,
    state::AppState,
};

pub fn tracking_number(order_number: &str, date: NaiveDate) -> String {
    format!("ENT{}{}", order_number, date.format("%Y%m%d"))
}

/// Customer-facing progress for an order in `status`.
pub fn tracking_steps(status: OrderStatus) -> Vec<TrackingStep> {
    let reached = match status {
        OrderStatus::Pending | OrderStatus::Cancelled => 1,
        OrderStatus::Processing => 2,
        OrderStatus::Shipped => 3,
        OrderStatus::Delivered => 4,
    };
    ["Order Placed", "Processing", "Shipped", "Delivered"]
        .into_iter()
        .enumerate()
        .map(|(i, name)| TrackingStep {
            name: name.to_string(),
            completed: i < reached,
        })
        .collect()
}

pub async fn update_shipping(
    state: &AppState,
    user: &AuthUser,
    payload: ShippingUpdateRequest,
) -> AppResult<ApiResponse<ShippingUpdateResult>> {
    if payload.order_number.trim().is_empty() {
        return Err(AppError::BadRequest("order_number is required".into()));
    }
    let change = order_service::change_status(
        state,
        user,
        &payload.order_number,
        &payload.status,
        payload.tracking_number,
        payload.carrier,
    )
    .await?;

    let message = format!(
        "Order {} status updated from {} to {}",
        change.order.order_number, change.old_status, change.new_status
    );
    Ok(ApiResponse::success(
        message.clone(),
        ShippingUpdateResult {
            order_number: change.order.order_number,
            old_status: change.old_status,
            new_status: change.new_status,
            tracking_number: change.order.tracking_number,
            message,
        },
        Some(Meta::empty()),
    ))
}

pub async fn shipping_status(
    state: &AppState,
    order_number: &str,
) -> AppResult<ApiResponse<ShippingStatus>> {
    let order = order_service::find_by_number(&state.orm, order_number).await?;
    let status: OrderStatus = order
        .status
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;

    Ok(ApiResponse::success(
        "Shipping status",
        ShippingStatus {
            order_number: order.order_number,
            status,
            status_display: status.display_name().to_string(),
            tracking_number: order.tracking_number,
            carrier: order.carrier,
            customer_name: order.customer_name,
            shipping_address: ShippingAddress {
                address: order.shipping_address,
                city: order.shipping_city,
                country: order.shipping_country,
                postal_code: order.shipping_postal_code,
            },
            steps: tracking_steps(status),
            created_at: order.created_at.with_timezone(&Utc),
            updated_at: order.updated_at.with_timezone(&Utc),
        },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(status: OrderStatus) -> Vec<bool> {
        tracking_steps(status).into_iter().map(|s| s.completed).collect()
    }

    #[test]
    fn tracking_number_embeds_order_and_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(tracking_number("ORD3F2A9C1E", date), "ENTORD3F2A9C1E20240307");
    }

    #[test]
    fn steps_follow_status() {
        assert_eq!(completed(OrderStatus::Pending), [true, false, false, false]);
        assert_eq!(completed(OrderStatus::Processing), [true, true, false, false]);
        assert_eq!(completed(OrderStatus::Shipped), [true, true, true, false]);
        assert_eq!(completed(OrderStatus::Delivered), [true, true, true, true]);
        assert_eq!(completed(OrderStatus::Cancelled), [true, false, false, false]);
    }

    #[test]
    fn step_names_are_stable() {
        let names: Vec<String> = tracking_steps(OrderStatus::Pending)
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, ["Order Placed", "Processing", "Shipped", "Delivered"]);
    }
}
