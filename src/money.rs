//! Money helpers. Every amount in the crate is an `i64` count of cents.

use serde::Serialize;
use utoipa::ToSchema;

/// Render cents as a US dollar string, e.g. `2500 -> "$25.00"`.
pub fn format_usd(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}${}.{:02}", abs / 100, abs % 100)
}

/// `amount * percent / 100`, rounded half away from zero.
pub fn percent_of(amount: i64, percent: i64) -> i64 {
    div_round(amount as i128 * percent as i128, 100)
}

/// `amount * bps / 10_000`, rounded half away from zero.
pub fn apply_bps(amount: i64, bps: i64) -> i64 {
    div_round(amount as i128 * bps as i128, 10_000)
}

fn div_round(numerator: i128, denominator: i128) -> i64 {
    let half = denominator / 2;
    let rounded = if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        (numerator - half) / denominator
    };
    rounded as i64
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct GhsConversion {
    pub usd_cents: i64,
    pub usd_display: String,
    pub ghs_pesewas: i64,
    pub ghs_display: String,
    pub exchange_rate: f64,
    pub rate_source: String,
    pub conversion_note: String,
}

/// Convert a USD amount in cents into Ghana cedi pesewas at `rate` GHS per USD.
pub fn convert_usd_to_ghs(usd_cents: i64, rate: f64) -> GhsConversion {
    let ghs_pesewas = (usd_cents as f64 * rate).round() as i64;
    let abs = ghs_pesewas.unsigned_abs();
    let sign = if ghs_pesewas < 0 { "-" } else { "" };
    GhsConversion {
        usd_cents,
        usd_display: format_usd(usd_cents),
        ghs_pesewas,
        ghs_display: format!("GH₵ {sign}{}.{:02}", abs / 100, abs % 100),
        exchange_rate: rate,
        rate_source: "configured".to_string(),
        conversion_note: format!("1 USD = {rate:.4} GHS"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_whole_and_fractional_dollars() {
        assert_eq!(format_usd(2500), "$25.00");
        assert_eq!(format_usd(999), "$9.99");
        assert_eq!(format_usd(5), "$0.05");
        assert_eq!(format_usd(0), "$0.00");
        assert_eq!(format_usd(-150), "-$1.50");
    }

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(percent_of(2500, 10), 250);
        assert_eq!(percent_of(1005, 10), 101);
        assert_eq!(percent_of(1004, 10), 100);
    }

    #[test]
    fn basis_points_tax() {
        assert_eq!(apply_bps(10_000, 500), 500);
        assert_eq!(apply_bps(1_999, 500), 100);
        assert_eq!(apply_bps(0, 500), 0);
    }

    #[test]
    fn converts_to_pesewas() {
        let conv = convert_usd_to_ghs(2500, 12.5);
        assert_eq!(conv.ghs_pesewas, 31_250);
        assert_eq!(conv.ghs_display, "GH₵ 312.50");
        assert_eq!(conv.usd_display, "$25.00");
        assert_eq!(conv.conversion_note, "1 USD = 12.5000 GHS");
    }
}
