use crate::models::{display::QR_SERVICE_URL, NewPayment, PaymentId};
use crate::services::PaymentSource;
use anyhow::{bail, Context, Result};
use reqwest::Url;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // Backend
    pub api_base_url: String,
    pub telegram_init_data: Option<String>,

    // Tracker timings
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub tick_interval: Duration,
    pub default_expiry: Duration,

    // Currencies
    pub price_currency: String,
    pub pay_currency: String,

    pub qr_service_url: String,
}

impl Config {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            telegram_init_data: None,
            request_timeout: Duration::from_secs(25),
            poll_interval: Duration::from_secs(10),
            tick_interval: Duration::from_secs(1),
            default_expiry: Duration::from_secs(15 * 60),
            price_currency: "usd".to_string(),
            pay_currency: "usdttrc20".to_string(),
            qr_service_url: QR_SERVICE_URL.to_string(),
        }
    }

    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            api_base_url: std::env::var("PAYMENT_API_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            telegram_init_data: std::env::var("TELEGRAM_INIT_DATA")
                .ok()
                .filter(|data| !data.is_empty()),

            request_timeout: Self::parse_secs("PAYMENT_REQUEST_TIMEOUT_SECS", 25)?,
            poll_interval: Self::parse_secs("PAYMENT_POLL_INTERVAL_SECS", 10)?,
            tick_interval: Self::parse_secs("PAYMENT_TICK_INTERVAL_SECS", 1)?,
            default_expiry: Self::parse_secs("PAYMENT_DEFAULT_EXPIRY_SECS", 15 * 60)?,

            price_currency: std::env::var("PAYMENT_PRICE_CURRENCY")
                .unwrap_or_else(|_| "usd".to_string()),
            pay_currency: std::env::var("PAYMENT_PAY_CURRENCY")
                .unwrap_or_else(|_| "usdttrc20".to_string()),

            qr_service_url: std::env::var("QR_SERVICE_URL")
                .unwrap_or_else(|_| QR_SERVICE_URL.to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    fn parse_secs(var: &str, default: u64) -> Result<Duration> {
        let secs = parse_var(var, default)?;
        Ok(Duration::from_secs(secs))
    }

    pub fn validate(&self) -> Result<()> {
        require_http_url("PAYMENT_API_URL", &self.api_base_url)?;
        require_http_url("QR_SERVICE_URL", &self.qr_service_url)?;

        for (name, value) in [
            ("PAYMENT_REQUEST_TIMEOUT_SECS", self.request_timeout),
            ("PAYMENT_POLL_INTERVAL_SECS", self.poll_interval),
            ("PAYMENT_TICK_INTERVAL_SECS", self.tick_interval),
        ] {
            if value.is_zero() {
                bail!("{} must be greater than zero", name);
            }
        }

        if self.pay_currency.trim().is_empty() {
            bail!("PAYMENT_PAY_CURRENCY must not be empty");
        }

        tracing::debug!("Configuration validated for {}", self.api_base_url);

        Ok(())
    }
}

// `PAYMENT_ID` selects an existing payment; otherwise `ORDER_ID` and
// `ORDER_AMOUNT` describe a new one.
pub fn payment_source_from_env(config: &Config) -> Result<PaymentSource> {
    dotenvy::dotenv().ok();

    if let Some(id) = std::env::var("PAYMENT_ID").ok().filter(|id| !id.is_empty()) {
        return Ok(PaymentSource::Existing(PaymentId::new(id)));
    }

    let order_id = std::env::var("ORDER_ID")
        .context("ORDER_ID required when PAYMENT_ID is not set")?;
    let amount: f64 = std::env::var("ORDER_AMOUNT")
        .context("ORDER_AMOUNT required when PAYMENT_ID is not set")?
        .parse()
        .context("Invalid ORDER_AMOUNT")?;
    if amount.is_nan() || amount <= 0.0 {
        bail!("ORDER_AMOUNT must be positive");
    }

    let mut order = NewPayment::new(order_id, amount)
        .with_price_currency(config.price_currency.clone())
        .with_pay_currency(config.pay_currency.clone());
    if let Ok(description) = std::env::var("ORDER_DESCRIPTION") {
        order = order.with_description(description);
    }
    if let Ok(title) = std::env::var("ORDER_TITLE") {
        order = order.with_title(title);
    }

    Ok(PaymentSource::Create(order))
}

pub fn copy_address_requested() -> Result<bool> {
    match std::env::var("PAYMENT_COPY_ADDRESS") {
        Ok(raw) if !raw.trim().is_empty() => {
            parse_flag(&raw).with_context(|| format!("Invalid PAYMENT_COPY_ADDRESS: {}", raw))
        }
        _ => Ok(false),
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("expected true/false, yes/no, on/off or 1/0"),
    }
}

fn require_http_url(var: &str, value: &str) -> Result<()> {
    let url = Url::parse(value).with_context(|| format!("{} must be HTTP(S) URL", var))?;
    if !matches!(url.scheme(), "http" | "https") || !url.has_host() {
        bail!("{} must be HTTP(S) URL", var);
    }
    Ok(())
}

fn parse_var<T>(var: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}", var)),
        _ => Ok(default),
    }
}
