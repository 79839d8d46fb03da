use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderItem};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub customer_email: String,
    pub customer_name: String,
    pub shipping_address: String,
    pub shipping_city: String,
    pub shipping_country: String,
    #[serde(default)]
    pub shipping_postal_code: String,
    pub payment_method: String,
    pub payment_reference: Option<String>,
    pub promo_code: Option<String>,
    pub items: Vec<OrderLineRequest>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderLineRequest {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
}
