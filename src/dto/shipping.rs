use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::OrderStatus;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ShippingUpdateRequest {
    pub order_number: String,
    pub status: String,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShippingUpdateResult {
    pub order_number: String,
    pub old_status: OrderStatus,
    pub new_status: OrderStatus,
    pub tracking_number: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct TrackingStep {
    pub name: String,
    pub completed: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShippingAddress {
    pub address: String,
    pub city: String,
    pub country: String,
    pub postal_code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShippingStatus {
    pub order_number: String,
    pub status: OrderStatus,
    pub status_display: String,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub customer_name: String,
    pub shipping_address: ShippingAddress,
    pub steps: Vec<TrackingStep>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
