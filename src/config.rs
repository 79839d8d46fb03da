use std::{env, str::FromStr};

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub cors_allowed_origins: Vec<String>,
    pub pricing: PricingConfig,
    pub usd_to_ghs_rate: f64,
    pub reviews_auto_approve: bool,
}

/// Checkout pricing knobs. All amounts are cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingConfig {
    pub shipping_flat_cents: i64,
    pub free_shipping_threshold_cents: i64,
    pub tax_rate_bps: i64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            shipping_flat_cents: 999,
            free_shipping_threshold_cents: 7500,
            tax_rate_bps: 500,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env_or("APP_PORT", 3000_u16)?;

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|raw| parse_list(&raw))
            .unwrap_or_default();

        let defaults = PricingConfig::default();
        let pricing = PricingConfig {
            shipping_flat_cents: env_or("SHIPPING_FLAT_CENTS", defaults.shipping_flat_cents)?,
            free_shipping_threshold_cents: env_or(
                "FREE_SHIPPING_THRESHOLD_CENTS",
                defaults.free_shipping_threshold_cents,
            )?,
            tax_rate_bps: env_or("TAX_RATE_BPS", defaults.tax_rate_bps)?,
        };
        if pricing.shipping_flat_cents < 0
            || pricing.free_shipping_threshold_cents < 0
            || pricing.tax_rate_bps < 0
        {
            anyhow::bail!("pricing settings must not be negative");
        }

        let usd_to_ghs_rate = env_or("USD_TO_GHS_RATE", 12.50_f64)?;
        if !(usd_to_ghs_rate.is_finite() && usd_to_ghs_rate > 0.0) {
            anyhow::bail!("USD_TO_GHS_RATE must be a positive number");
        }

        let reviews_auto_approve = env_or("REVIEWS_AUTO_APPROVE", true)?;

        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            cors_allowed_origins,
            pricing,
            usd_to_ghs_rate,
            reviews_auto_approve,
        })
    }
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid value for {key}: {e}")),
        _ => Ok(default),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_empty_entries_dropped() {
        let parsed = parse_list(" https://a.example , ,https://b.example,");
        assert_eq!(parsed, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn pricing_defaults_match_storefront_policy() {
        let pricing = PricingConfig::default();
        assert_eq!(pricing.shipping_flat_cents, 999);
        assert_eq!(pricing.free_shipping_threshold_cents, 7500);
        assert_eq!(pricing.tax_rate_bps, 500);
    }
}
