use std::env;

use crate::services::pricing::{PriceTable, PricingConfig};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub site_url: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub stripe_api_base: String,
    pub paylink_api_url: String,
    pub paylink_api_key: String,
    pub paylink_webhook_secret: String,
    pub email_api_url: String,
    pub email_api_key: String,
    pub email_from: String,
    pub shop_email: String,
    pub pricing: PricingConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "motorent.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            site_url: env::var("SITE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
            stripe_api_base: env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            paylink_api_url: env::var("PAYLINK_API_URL").unwrap_or_default(),
            paylink_api_key: env::var("PAYLINK_API_KEY").unwrap_or_default(),
            paylink_webhook_secret: env::var("PAYLINK_WEBHOOK_SECRET").unwrap_or_default(),
            email_api_url: env::var("EMAIL_API_URL")
                .unwrap_or_else(|_| "https://api.resend.com/emails".to_string()),
            email_api_key: env::var("EMAIL_API_KEY").unwrap_or_default(),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "Motorent <bookings@motorent.local>".to_string()),
            shop_email: env::var("SHOP_EMAIL").unwrap_or_default(),
            pricing: pricing_from_env(),
        }
    }
}

fn pricing_from_env() -> PricingConfig {
    pricing_from_vars(|key| env::var(key).ok())
}

fn pricing_from_vars(var: impl Fn(&str) -> Option<String>) -> PricingConfig {
    let defaults = PricingConfig::default();

    let table = match var("PRICE_TABLE") {
        Some(json) => match PriceTable::from_json(&json) {
            Ok(table) => table,
            Err(e) => {
                tracing::warn!(error = %e, "invalid PRICE_TABLE, using default price table");
                PriceTable::default()
            }
        },
        None => PriceTable::default(),
    };

    PricingConfig {
        table,
        down_payment_percent: var("DOWN_PAYMENT_PERCENT")
            .and_then(|v| v.parse().ok())
            .filter(|p: &i64| (0..=100).contains(p))
            .unwrap_or(defaults.down_payment_percent),
        deposit_per_bike_cents: var("DEPOSIT_PER_BIKE_CENTS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.deposit_per_bike_cents),
        currency: var("CURRENCY")
            .map(|c| c.to_lowercase())
            .unwrap_or(defaults.currency),
    }
}
