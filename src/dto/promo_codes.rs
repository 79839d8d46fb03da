use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::models::{DiscountType, PromoCode, PublicPromoCode};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidatePromoRequest {
    pub code: String,
    /// Cart subtotal in cents.
    pub subtotal: i64,
}

#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct PromoValidation {
    pub valid: bool,
    pub code: String,
    pub description: String,
    pub discount_type: DiscountType,
    pub discount_amount: i64,
    pub discount_display: String,
    pub free_shipping: bool,
    pub message: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePromoRequest {
    pub code: String,
    #[serde(default)]
    pub description: String,
    pub discount_type: DiscountType,
    #[serde(default)]
    pub discount_value: i64,
    #[serde(default)]
    pub minimum_order_amount: i64,
    pub maximum_discount_amount: Option<i64>,
    pub usage_limit: Option<i32>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdatePromoRequest {
    pub description: Option<String>,
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<i64>,
    pub minimum_order_amount: Option<i64>,
    /// Omit to keep the current cap, `null` to remove it.
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<i64>)]
    pub maximum_discount_amount: Option<Option<i64>>,
    /// Omit to keep the current limit, `null` to remove it.
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<i32>)]
    pub usage_limit: Option<Option<i32>>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

// Present fields land in `Some`, so an explicit `null` becomes `Some(None)`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct PromoList {
    #[schema(value_type = Vec<PromoCode>)]
    pub items: Vec<PromoCode>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct PublicPromoList {
    #[schema(value_type = Vec<PublicPromoCode>)]
    pub items: Vec<PublicPromoCode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_distinguishes_missing_from_null_limits() {
        let untouched: UpdatePromoRequest = serde_json::from_str("{}").expect("empty body");
        assert_eq!(untouched.maximum_discount_amount, None);
        assert_eq!(untouched.usage_limit, None);

        let cleared: UpdatePromoRequest =
            serde_json::from_str(r#"{"maximum_discount_amount": null, "usage_limit": null}"#)
                .expect("null body");
        assert_eq!(cleared.maximum_discount_amount, Some(None));
        assert_eq!(cleared.usage_limit, Some(None));

        let set: UpdatePromoRequest =
            serde_json::from_str(r#"{"maximum_discount_amount": 1500, "usage_limit": 10}"#)
                .expect("value body");
        assert_eq!(set.maximum_discount_amount, Some(Some(1500)));
        assert_eq!(set.usage_limit, Some(Some(10)));
    }
}
