use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use uuid::Uuid;

use crate::{
    audit,
    dto::promo_codes::{
        CreatePromoRequest, PromoList, PromoValidation, PublicPromoList, UpdatePromoRequest,
        ValidatePromoRequest,
    },
    entity::promo_codes::{ActiveModel, Column, Entity as PromoCodes, Model as PromoModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{DiscountType, PromoCode, PublicPromoCode},
    money::{format_usd, percent_of},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Outcome of applying a code to a subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromoQuote {
    pub discount_type: DiscountType,
    pub discount_amount: i64,
    pub free_shipping: bool,
}

pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

pub fn discount_display(kind: DiscountType, value: i64) -> String {
    match kind {
        DiscountType::Percentage => format!("{value}% off"),
        DiscountType::Fixed => format!("{} off", format_usd(value)),
        DiscountType::FreeShipping => "Free shipping".to_string(),
    }
}

/// Check a code's rules against `subtotal` (cents) at `now`.
/// Rules are checked in a fixed order and the first failure is reported.
pub fn evaluate(promo: &PromoModel, subtotal: i64, now: DateTime<Utc>) -> Result<PromoQuote, String> {
    let kind: DiscountType = promo
        .discount_type
        .parse()
        .map_err(|_| "This promo code is not valid".to_string())?;

    if !promo.is_active {
        return Err("This promo code is not active".into());
    }
    if now < promo.valid_from {
        return Err("This promo code is not yet valid".into());
    }
    if now > promo.valid_until {
        return Err("This promo code has expired".into());
    }
    if let Some(limit) = promo.usage_limit {
        if promo.used_count >= limit {
            return Err("This promo code has reached its usage limit".into());
        }
    }
    if subtotal < promo.minimum_order_amount {
        return Err(format!(
            "Minimum order amount of {} required",
            format_usd(promo.minimum_order_amount)
        ));
    }

    let raw = match kind {
        DiscountType::Percentage => percent_of(subtotal, promo.discount_value),
        DiscountType::Fixed => promo.discount_value,
        DiscountType::FreeShipping => 0,
    };
    let capped = match promo.maximum_discount_amount {
        Some(max) => raw.min(max),
        None => raw,
    };

    Ok(PromoQuote {
        discount_type: kind,
        discount_amount: capped.clamp(0, subtotal.max(0)),
        free_shipping: kind == DiscountType::FreeShipping,
    })
}

/// Validate admin-supplied terms before they reach the database.
pub fn validate_terms(
    kind: DiscountType,
    value: i64,
    minimum: i64,
    maximum: Option<i64>,
    usage_limit: Option<i32>,
    valid_from: DateTime<Utc>,
    valid_until: DateTime<Utc>,
) -> Result<(), String> {
    match kind {
        DiscountType::Percentage if !(1..=100).contains(&value) => {
            return Err("percentage discount must be between 1 and 100".into());
        }
        DiscountType::Fixed if value <= 0 => {
            return Err("fixed discount must be greater than 0".into());
        }
        _ => {}
    }
    if minimum < 0 {
        return Err("minimum_order_amount must not be negative".into());
    }
    if maximum.is_some_and(|m| m <= 0) {
        return Err("maximum_discount_amount must be greater than 0".into());
    }
    if usage_limit.is_some_and(|l| l <= 0) {
        return Err("usage_limit must be greater than 0".into());
    }
    if valid_until <= valid_from {
        return Err("valid_until must be after valid_from".into());
    }
    Ok(())
}

pub async fn list_public(state: &AppState) -> AppResult<ApiResponse<PublicPromoList>> {
    let now = Utc::now();
    let items: Vec<PublicPromoCode> = PromoCodes::find()
        .filter(Column::IsActive.eq(true))
        .filter(Column::ValidFrom.lte(now))
        .filter(Column::ValidUntil.gte(now))
        .order_by_asc(Column::Code)
        .all(&state.orm)
        .await?
        .into_iter()
        .filter(|p| p.usage_limit.is_none_or(|limit| p.used_count < limit))
        .filter_map(|p| {
            let kind = p.discount_type.parse::<DiscountType>().ok()?;
            Some(PublicPromoCode {
                discount_display: discount_display(kind, p.discount_value),
                code: p.code,
                description: p.description,
                minimum_order_amount: p.minimum_order_amount,
                valid_until: p.valid_until.with_timezone(&Utc),
            })
        })
        .collect();

    let meta = Meta::total(items.len() as i64);
    Ok(ApiResponse::success("Promo codes", PublicPromoList { items }, Some(meta)))
}

pub async fn validate(
    state: &AppState,
    payload: ValidatePromoRequest,
) -> AppResult<ApiResponse<PromoValidation>> {
    if payload.subtotal < 0 {
        return Err(AppError::BadRequest("subtotal must not be negative".into()));
    }
    let code = normalize_code(&payload.code);
    if code.is_empty() {
        return Err(AppError::BadRequest("Please enter a promo code".into()));
    }

    let promo = PromoCodes::find()
        .filter(Column::Code.eq(code.as_str()))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let quote = evaluate(&promo, payload.subtotal, Utc::now()).map_err(AppError::BadRequest)?;
    let display = discount_display(quote.discount_type, promo.discount_value);

    tracing::debug!(code = %promo.code, discount = quote.discount_amount, "promo code validated");

    Ok(ApiResponse::success(
        "Promo code is valid",
        PromoValidation {
            valid: true,
            message: format!("Promo code applied: {display}"),
            code: promo.code,
            description: promo.description,
            discount_type: quote.discount_type,
            discount_amount: quote.discount_amount,
            discount_display: display,
            free_shipping: quote.free_shipping,
        },
        Some(Meta::empty()),
    ))
}

/// Lock the code row inside an order transaction and price it against `subtotal`.
pub async fn lock_for_order<C: ConnectionTrait>(
    db: &C,
    code: &str,
    subtotal: i64,
) -> AppResult<(PromoModel, PromoQuote)> {
    let promo = PromoCodes::find()
        .filter(Column::Code.eq(normalize_code(code)))
        .lock(LockType::Update)
        .one(db)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid promo code".into()))?;

    let quote = evaluate(&promo, subtotal, Utc::now()).map_err(AppError::BadRequest)?;
    Ok((promo, quote))
}

pub async fn mark_used<C: ConnectionTrait>(db: &C, promo: PromoModel) -> AppResult<()> {
    let used = promo.used_count + 1;
    let mut active: ActiveModel = promo.into();
    active.used_count = Set(used);
    active.update(db).await?;
    Ok(())
}

pub async fn list_all(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<PromoList>> {
    ensure_admin(user)?;
    let items = PromoCodes::find()
        .order_by_desc(Column::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(promo_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::total(items.len() as i64);
    Ok(ApiResponse::success("Promo codes", PromoList { items }, Some(meta)))
}

pub async fn create(
    state: &AppState,
    user: &AuthUser,
    payload: CreatePromoRequest,
) -> AppResult<ApiResponse<PromoCode>> {
    ensure_admin(user)?;
    let code = normalize_code(&payload.code);
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(AppError::BadRequest(
            "code must be letters, digits, '-' or '_'".into(),
        ));
    }
    let valid_from = payload.valid_from.unwrap_or_else(Utc::now);
    validate_terms(
        payload.discount_type,
        payload.discount_value,
        payload.minimum_order_amount,
        payload.maximum_discount_amount,
        payload.usage_limit,
        valid_from,
        payload.valid_until,
    )
    .map_err(AppError::BadRequest)?;

    let exists = PromoCodes::find()
        .filter(Column::Code.eq(code.as_str()))
        .one(&state.orm)
        .await?;
    if exists.is_some() {
        return Err(AppError::Conflict(format!("promo code {code} already exists")));
    }

    let promo = ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set(code),
        description: Set(payload.description),
        discount_type: Set(payload.discount_type.as_str().to_string()),
        discount_value: Set(payload.discount_value),
        minimum_order_amount: Set(payload.minimum_order_amount),
        maximum_discount_amount: Set(payload.maximum_discount_amount),
        usage_limit: Set(payload.usage_limit),
        used_count: Set(0),
        valid_from: Set(valid_from.into()),
        valid_until: Set(payload.valid_until.into()),
        is_active: Set(payload.is_active),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "promo_create",
        "promo_codes",
        serde_json::json!({ "promo_id": promo.id, "code": promo.code }),
    )
    .await;

    Ok(ApiResponse::success(
        "Promo code created",
        promo_from_entity(promo)?,
        Some(Meta::empty()),
    ))
}

pub async fn update(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdatePromoRequest,
) -> AppResult<ApiResponse<PromoCode>> {
    ensure_admin(user)?;
    let existing = PromoCodes::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let current_kind: DiscountType = existing
        .discount_type
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;
    let kind = payload.discount_type.unwrap_or(current_kind);
    let value = payload.discount_value.unwrap_or(existing.discount_value);
    let minimum = payload
        .minimum_order_amount
        .unwrap_or(existing.minimum_order_amount);
    let maximum = payload
        .maximum_discount_amount
        .unwrap_or(existing.maximum_discount_amount);
    let usage_limit = payload.usage_limit.unwrap_or(existing.usage_limit);
    let valid_from = payload
        .valid_from
        .unwrap_or_else(|| existing.valid_from.with_timezone(&Utc));
    let valid_until = payload
        .valid_until
        .unwrap_or_else(|| existing.valid_until.with_timezone(&Utc));
    validate_terms(kind, value, minimum, maximum, usage_limit, valid_from, valid_until)
        .map_err(AppError::BadRequest)?;

    let mut active: ActiveModel = existing.into();
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.discount_type = Set(kind.as_str().to_string());
    active.discount_value = Set(value);
    active.minimum_order_amount = Set(minimum);
    active.maximum_discount_amount = Set(maximum);
    active.usage_limit = Set(usage_limit);
    active.valid_from = Set(valid_from.into());
    active.valid_until = Set(valid_until.into());
    let promo = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "promo_update",
        "promo_codes",
        serde_json::json!({ "promo_id": promo.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        promo_from_entity(promo)?,
        Some(Meta::empty()),
    ))
}

pub async fn delete(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = PromoCodes::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "promo_delete",
        "promo_codes",
        serde_json::json!({ "promo_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

fn promo_from_entity(model: PromoModel) -> AppResult<PromoCode> {
    let kind: DiscountType = model
        .discount_type
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;
    Ok(PromoCode {
        id: model.id,
        discount_display: discount_display(kind, model.discount_value),
        code: model.code,
        description: model.description,
        discount_type: kind,
        discount_value: model.discount_value,
        minimum_order_amount: model.minimum_order_amount,
        maximum_discount_amount: model.maximum_discount_amount,
        usage_limit: model.usage_limit,
        used_count: model.used_count,
        valid_from: model.valid_from.with_timezone(&Utc),
        valid_until: model.valid_until.with_timezone(&Utc),
        is_active: model.is_active,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn promo(kind: &str, value: i64) -> PromoModel {
        let now = Utc::now();
        PromoModel {
            id: Uuid::new_v4(),
            code: "TEST".into(),
            description: "test code".into(),
            discount_type: kind.into(),
            discount_value: value,
            minimum_order_amount: 0,
            maximum_discount_amount: None,
            usage_limit: None,
            used_count: 0,
            valid_from: (now - Duration::days(1)).into(),
            valid_until: (now + Duration::days(30)).into(),
            is_active: true,
            created_at: now.into(),
        }
    }

    #[test]
    fn percentage_discount_is_capped() {
        let mut p = promo("percentage", 10);
        assert_eq!(evaluate(&p, 10_000, Utc::now()).unwrap().discount_amount, 1_000);

        p.maximum_discount_amount = Some(500);
        assert_eq!(evaluate(&p, 10_000, Utc::now()).unwrap().discount_amount, 500);
    }

    #[test]
    fn fixed_discount_never_exceeds_subtotal() {
        let p = promo("fixed", 1_500);
        assert_eq!(evaluate(&p, 9_000, Utc::now()).unwrap().discount_amount, 1_500);
        assert_eq!(evaluate(&p, 1_000, Utc::now()).unwrap().discount_amount, 1_000);
    }

    #[test]
    fn free_shipping_gives_flag_not_discount() {
        let quote = evaluate(&promo("free_shipping", 0), 2_000, Utc::now()).unwrap();
        assert_eq!(quote.discount_amount, 0);
        assert!(quote.free_shipping);
    }

    #[test]
    fn minimum_subtotal_is_enforced() {
        let mut p = promo("fixed", 1_500);
        p.minimum_order_amount = 7_500;
        assert_eq!(
            evaluate(&p, 7_499, Utc::now()).unwrap_err(),
            "Minimum order amount of $75.00 required"
        );
        assert!(evaluate(&p, 7_500, Utc::now()).is_ok());
    }

    #[test]
    fn window_activity_and_usage_rules() {
        let now = Utc::now();

        let mut expired = promo("percentage", 10);
        expired.valid_until = (now - Duration::hours(1)).into();
        assert_eq!(evaluate(&expired, 100, now).unwrap_err(), "This promo code has expired");

        let mut early = promo("percentage", 10);
        early.valid_from = (now + Duration::hours(1)).into();
        assert_eq!(evaluate(&early, 100, now).unwrap_err(), "This promo code is not yet valid");

        let mut inactive = promo("percentage", 10);
        inactive.is_active = false;
        assert_eq!(evaluate(&inactive, 100, now).unwrap_err(), "This promo code is not active");

        let mut used_up = promo("percentage", 10);
        used_up.usage_limit = Some(3);
        used_up.used_count = 3;
        assert_eq!(
            evaluate(&used_up, 100, now).unwrap_err(),
            "This promo code has reached its usage limit"
        );
    }

    #[test]
    fn codes_are_normalized() {
        assert_eq!(normalize_code("  ennc10 "), "ENNC10");
    }

    #[test]
    fn display_strings() {
        assert_eq!(discount_display(DiscountType::Percentage, 10), "10% off");
        assert_eq!(discount_display(DiscountType::Fixed, 1_500), "$15.00 off");
        assert_eq!(discount_display(DiscountType::FreeShipping, 0), "Free shipping");
    }

    #[test]
    fn terms_validation() {
        let from = Utc::now();
        let until = from + Duration::days(1);
        assert!(validate_terms(DiscountType::Percentage, 10, 0, None, None, from, until).is_ok());
        assert!(validate_terms(DiscountType::Percentage, 120, 0, None, None, from, until).is_err());
        assert!(validate_terms(DiscountType::Fixed, 0, 0, None, None, from, until).is_err());
        assert!(validate_terms(DiscountType::FreeShipping, 0, 0, None, None, from, until).is_ok());
        assert!(validate_terms(DiscountType::Fixed, 100, 0, None, Some(0), from, until).is_err());
        assert!(validate_terms(DiscountType::Fixed, 100, 0, None, None, until, from).is_err());
    }
}
