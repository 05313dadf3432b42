// config.rs
use std::str::FromStr;

use crate::service::{commission::DEFAULT_COMMISSION_RATE_BPS, invoice_service::DEFAULT_TAX_RATE_BPS};

pub const DEFAULT_PAYMENT_EXPIRY_DAYS: i64 = 14;
pub const MAX_PAYMENT_EXPIRY_DAYS: i64 = 3_650;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    // Payment gateway
    pub payment_gateway_url: String,
    pub payment_key_id: String,
    pub payment_key_secret: String,
    pub payment_gateway_timeout_secs: u64,
    pub payment_currency: String,
    pub manual_payment_url: String,
    // Pricing
    pub commission_rate_bps: i64,
    pub tax_rate_bps: i64,
    // Expiry policy for unconfirmed cash payments and open disputes
    pub payment_expiry_days: i64,
    pub sweep_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: None,
            port: 8000,
            cors_allowed_origins: vec!["http://localhost:5173".to_string()],
            payment_gateway_url: "https://api.razorpay.com/v1".to_string(),
            payment_key_id: "test_key_id".to_string(),
            payment_key_secret: "test_secret_key".to_string(),
            payment_gateway_timeout_secs: 10,
            payment_currency: "INR".to_string(),
            manual_payment_url: "https://pay.example.com/homeserve".to_string(),
            commission_rate_bps: DEFAULT_COMMISSION_RATE_BPS,
            tax_rate_bps: DEFAULT_TAX_RATE_BPS,
            payment_expiry_days: DEFAULT_PAYMENT_EXPIRY_DAYS,
            sweep_interval_secs: 3_600,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(value) => value.trim().parse::<T>().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid value for {}: {:?}", key, value);
            default
        }),
        Err(_) => default,
    }
}

fn bounded_expiry_days(days: i64) -> i64 {
    if (1..=MAX_PAYMENT_EXPIRY_DAYS).contains(&days) {
        days
    } else {
        tracing::warn!(
            "PAYMENT_EXPIRY_DAYS must be between 1 and {}, got {}; using {}",
            MAX_PAYMENT_EXPIRY_DAYS,
            days,
            DEFAULT_PAYMENT_EXPIRY_DAYS
        );
        DEFAULT_PAYMENT_EXPIRY_DAYS
    }
}

impl Config {
    pub fn init() -> Config {
        let defaults = Config::default();

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.cors_allowed_origins);

        let payment_gateway_url = std::env::var("PAYMENT_GATEWAY_URL")
            .unwrap_or(defaults.payment_gateway_url);
        let payment_key_id = std::env::var("PAYMENT_KEY_ID")
            .unwrap_or(defaults.payment_key_id);
        let payment_key_secret = std::env::var("PAYMENT_KEY_SECRET")
            .ok()
            .filter(|secret| !secret.trim().is_empty())
            .expect("PAYMENT_KEY_SECRET must be set");
        let payment_currency = std::env::var("PAYMENT_CURRENCY")
            .unwrap_or(defaults.payment_currency);
        let manual_payment_url = std::env::var("MANUAL_PAYMENT_URL")
            .unwrap_or(defaults.manual_payment_url);

        Config {
            database_url,
            port: env_or("PORT", defaults.port),
            cors_allowed_origins,
            payment_gateway_url,
            payment_key_id,
            payment_key_secret,
            payment_gateway_timeout_secs: env_or(
                "PAYMENT_GATEWAY_TIMEOUT_SECS",
                defaults.payment_gateway_timeout_secs,
            ),
            payment_currency,
            manual_payment_url,
            commission_rate_bps: env_or("COMMISSION_RATE_BPS", defaults.commission_rate_bps),
            tax_rate_bps: env_or("TAX_RATE_BPS", defaults.tax_rate_bps),
            payment_expiry_days: bounded_expiry_days(env_or(
                "PAYMENT_EXPIRY_DAYS",
                defaults.payment_expiry_days,
            )),
            sweep_interval_secs: env_or("SWEEP_INTERVAL_SECS", defaults.sweep_interval_secs),
        }
    }

    /// How long a cash payment may wait for confirmation, or a dispute may
    /// stay open, before the sweeper acts.
    pub fn payment_expiry_window(&self) -> chrono::Duration {
        chrono::Duration::days(self.payment_expiry_days.clamp(1, MAX_PAYMENT_EXPIRY_DAYS))
    }
}
