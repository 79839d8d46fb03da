use crate::{config::PricingConfig, money::apply_bps};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: i64,
    pub discount: i64,
    pub shipping: i64,
    pub tax: i64,
    pub total: i64,
}

/// Price an order from its line subtotal and an already-capped discount.
///
/// Shipping is waived when the pre-discount subtotal reaches the free
/// threshold or a free-shipping code was applied. Tax is charged on the
/// discounted subtotal only.
pub fn compute_totals(
    subtotal: i64,
    discount: i64,
    free_shipping: bool,
    pricing: &PricingConfig,
) -> OrderTotals {
    let discount = discount.clamp(0, subtotal.max(0));
    let shipping = if free_shipping || subtotal >= pricing.free_shipping_threshold_cents {
        0
    } else {
        pricing.shipping_flat_cents
    };
    let taxable = subtotal - discount;
    let tax = apply_bps(taxable, pricing.tax_rate_bps);

    OrderTotals {
        subtotal,
        discount,
        shipping,
        tax,
        total: taxable + shipping + tax,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_order_pays_flat_shipping_and_tax() {
        let totals = compute_totals(5_000, 0, false, &PricingConfig::default());
        assert_eq!(
            totals,
            OrderTotals {
                subtotal: 5_000,
                discount: 0,
                shipping: 999,
                tax: 250,
                total: 6_249,
            }
        );
    }

    #[test]
    fn threshold_waives_shipping_before_discount() {
        let totals = compute_totals(8_000, 1_000, false, &PricingConfig::default());
        assert_eq!(totals.shipping, 0);
        assert_eq!(totals.tax, 350);
        assert_eq!(totals.total, 7_350);
    }

    #[test]
    fn free_shipping_code_waives_shipping() {
        let totals = compute_totals(2_000, 0, true, &PricingConfig::default());
        assert_eq!(totals.shipping, 0);
        assert_eq!(totals.total, 2_100);
    }

    #[test]
    fn discount_cannot_push_total_below_shipping() {
        let totals = compute_totals(1_000, 5_000, false, &PricingConfig::default());
        assert_eq!(totals.discount, 1_000);
        assert_eq!(totals.tax, 0);
        assert_eq!(totals.total, 999);
    }
}
