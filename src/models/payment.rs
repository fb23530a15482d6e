use super::status::PaymentStatus;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PaymentId(String);

impl PaymentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PaymentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<u64> for PaymentId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// Payment record as returned by `/payments/create` and
/// `/payments/payment/{id}`. Absent and `null` fields are both `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    #[serde(default, deserialize_with = "opt_payment_id", skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<PaymentId>,

    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,

    #[serde(default, deserialize_with = "opt_number", skip_serializing_if = "Option::is_none")]
    pub price_amount: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_currency: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pay_address: Option<String>,

    #[serde(default, deserialize_with = "opt_number", skip_serializing_if = "Option::is_none")]
    pub pay_amount: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pay_currency: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_estimate_date: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Payment {
    pub fn status(&self) -> PaymentStatus {
        PaymentStatus::parse(self.payment_status.as_deref())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expiration_estimate_date
            .as_deref()
            .and_then(parse_timestamp)
    }

    pub fn pay_address(&self) -> &str {
        self.pay_address.as_deref().unwrap_or("")
    }

    /// Shallow merge: every field present in `remote` overwrites ours.
    pub fn merge(&mut self, remote: Payment) {
        overwrite(&mut self.payment_id, remote.payment_id);
        overwrite(&mut self.order_id, remote.order_id);
        overwrite(&mut self.price_amount, remote.price_amount);
        overwrite(&mut self.price_currency, remote.price_currency);
        overwrite(&mut self.pay_address, remote.pay_address);
        overwrite(&mut self.pay_amount, remote.pay_amount);
        overwrite(&mut self.pay_currency, remote.pay_currency);
        overwrite(&mut self.payment_status, remote.payment_status);
        overwrite(
            &mut self.expiration_estimate_date,
            remote.expiration_estimate_date,
        );

        for (key, value) in remote.extra {
            if !value.is_null() {
                self.extra.insert(key, value);
            }
        }
    }
}

fn overwrite<T>(slot: &mut Option<T>, incoming: Option<T>) {
    if incoming.is_some() {
        *slot = incoming;
    }
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatePaymentRequest {
    pub amount: f64,
    pub price_currency: String,
    pub pay_currency: String,
    pub order_id: String,
    pub order_description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub order_id: String,
    pub amount: f64,
    pub price_currency: String,
    pub pay_currency: String,
    pub description: Option<String>,
    pub title: Option<String>,
}

impl NewPayment {
    pub fn new(order_id: impl Into<String>, amount: f64) -> Self {
        Self {
            order_id: order_id.into(),
            amount,
            price_currency: "usd".to_string(),
            pay_currency: "usdttrc20".to_string(),
            description: None,
            title: None,
        }
    }

    pub fn with_price_currency(mut self, currency: impl Into<String>) -> Self {
        self.price_currency = currency.into();
        self
    }

    pub fn with_pay_currency(mut self, currency: impl Into<String>) -> Self {
        self.pay_currency = currency.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn order_description(&self) -> String {
        [&self.description, &self.title]
            .into_iter()
            .flatten()
            .find(|text| !text.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| format!("Order {}", self.order_id))
    }

    pub fn request(&self) -> CreatePaymentRequest {
        CreatePaymentRequest {
            amount: self.amount,
            price_currency: self.price_currency.clone(),
            pay_currency: self.pay_currency.clone(),
            order_id: self.order_id.clone(),
            order_description: self.order_description(),
        }
    }
}

fn opt_payment_id<'de, D>(deserializer: D) -> Result<Option<PaymentId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_text(deserializer)?.map(PaymentId))
}

fn opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

fn opt_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => Ok(number.as_f64()),
        Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
        Some(Value::String(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid number: {}", text))),
        Some(other) => Err(de::Error::custom(format!("expected number, got {}", other))),
    }
}
