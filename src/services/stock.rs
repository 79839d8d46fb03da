//! Stock availability rules shared by catalog reads and order placement.

/// The stock-relevant slice of a variant row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantStock {
    pub stock_quantity: i32,
    pub is_available: bool,
}

impl VariantStock {
    pub fn is_in_stock(&self) -> bool {
        self.stock_quantity > 0 && self.is_available
    }
}

/// A product is in stock when it has its own units or any sellable variant does.
pub fn product_in_stock<I>(stock_quantity: i32, variants: I) -> bool
where
    I: IntoIterator<Item = VariantStock>,
{
    stock_quantity > 0 || variants.into_iter().any(|v| v.is_in_stock())
}

/// Variant price is the product price plus its adjustment, floored at zero.
pub fn variant_final_price(product_price: i64, price_adjustment: i64) -> i64 {
    (product_price + price_adjustment).max(0)
}

/// Everything needed to decide whether one order line can be fulfilled.
#[derive(Debug, Clone)]
pub struct LineCheck<'a> {
    pub title: &'a str,
    pub is_active: bool,
    pub product_stock: i32,
    /// Variants of the product, used when no specific variant was chosen.
    pub product_variants: &'a [VariantStock],
    pub variant: Option<VariantStock>,
    pub requested: i32,
}

/// Returns a shopper-facing message when the line cannot be fulfilled.
pub fn check_line(line: &LineCheck<'_>) -> Option<String> {
    if !line.is_active {
        return Some(format!("{} is no longer available", line.title));
    }

    match line.variant {
        Some(variant) => {
            if !variant.is_available {
                Some(format!("{} (selected variant) is not available", line.title))
            } else if variant.stock_quantity < line.requested {
                Some(format!(
                    "{} (selected variant): Only {} in stock, but {} requested",
                    line.title, variant.stock_quantity, line.requested
                ))
            } else {
                None
            }
        }
        None => {
            if !product_in_stock(line.product_stock, line.product_variants.iter().copied()) {
                Some(format!("{} is out of stock", line.title))
            } else if line.product_stock < line.requested {
                Some(format!(
                    "{}: Only {} in stock, but {} requested",
                    line.title, line.product_stock, line.requested
                ))
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOLD_OUT: VariantStock = VariantStock {
        stock_quantity: 0,
        is_available: true,
    };
    const HIDDEN: VariantStock = VariantStock {
        stock_quantity: 4,
        is_available: false,
    };
    const READY: VariantStock = VariantStock {
        stock_quantity: 2,
        is_available: true,
    };

    fn line<'a>(variants: &'a [VariantStock], variant: Option<VariantStock>, stock: i32, qty: i32) -> LineCheck<'a> {
        LineCheck {
            title: "Hoodie",
            is_active: true,
            product_stock: stock,
            product_variants: variants,
            variant,
            requested: qty,
        }
    }

    #[test]
    fn own_stock_is_enough() {
        assert!(product_in_stock(3, []));
    }

    #[test]
    fn any_sellable_variant_makes_product_available() {
        assert!(product_in_stock(0, [SOLD_OUT, READY]));
    }

    #[test]
    fn unavailable_or_empty_variants_do_not_count() {
        assert!(!product_in_stock(0, [SOLD_OUT, HIDDEN]));
        assert!(!product_in_stock(0, []));
    }

    #[test]
    fn final_price_applies_adjustment() {
        assert_eq!(variant_final_price(2500, 300), 2800);
        assert_eq!(variant_final_price(2500, -500), 2000);
        assert_eq!(variant_final_price(200, -500), 0);
    }

    #[test]
    fn inactive_product_is_rejected_first() {
        let mut check = line(&[], None, 10, 1);
        check.is_active = false;
        assert_eq!(check_line(&check).as_deref(), Some("Hoodie is no longer available"));
    }

    #[test]
    fn variant_lines_check_variant_stock() {
        assert_eq!(check_line(&line(&[], Some(READY), 0, 2)), None);
        assert_eq!(
            check_line(&line(&[], Some(READY), 50, 3)).as_deref(),
            Some("Hoodie (selected variant): Only 2 in stock, but 3 requested")
        );
        assert_eq!(
            check_line(&line(&[], Some(HIDDEN), 50, 1)).as_deref(),
            Some("Hoodie (selected variant) is not available")
        );
    }

    #[test]
    fn plain_lines_check_product_stock() {
        assert_eq!(check_line(&line(&[], None, 5, 5)), None);
        assert_eq!(
            check_line(&line(&[], None, 0, 1)).as_deref(),
            Some("Hoodie is out of stock")
        );
        assert_eq!(
            check_line(&line(&[], None, 1, 2)).as_deref(),
            Some("Hoodie: Only 1 in stock, but 2 requested")
        );
    }

    #[test]
    fn variant_stock_does_not_cover_a_line_without_variant() {
        let variants = [READY];
        assert_eq!(
            check_line(&line(&variants, None, 0, 1)).as_deref(),
            Some("Hoodie: Only 0 in stock, but 1 requested")
        );
    }
}
