use super::PaymentApi;
use crate::config::Config;
use crate::error::ApiError;
use crate::models::{CreatePaymentRequest, Payment, PaymentId};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE},
    Client, Response,
};
use serde_json::Value;

pub const INIT_DATA_HEADER: &str = "x-telegram-init-data";

#[derive(Clone)]
pub struct PaymentClient {
    client: Client,
    base_url: String,
}

impl PaymentClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(init_data) = &config.telegram_init_data {
            let value = HeaderValue::from_str(init_data)
                .context("TELEGRAM_INIT_DATA is not a valid header value")?;
            headers.insert(HeaderName::from_static(INIT_DATA_HEADER), value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl PaymentApi for PaymentClient {
    async fn create_payment(&self, request: &CreatePaymentRequest) -> Result<Payment, ApiError> {
        tracing::debug!(
            order_id = %request.order_id,
            amount = request.amount,
            pay_currency = %request.pay_currency,
            "Creating payment"
        );

        let response = self
            .client
            .post(self.url("/payments/create"))
            .json(request)
            .send()
            .await?;

        read_payment(response).await
    }

    async fn get_payment(&self, payment_id: &PaymentId) -> Result<Payment, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("/payments/payment/{}", payment_id)))
            .send()
            .await?;

        read_payment(response).await
    }
}

async fn read_payment(response: Response) -> Result<Payment, ApiError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let detail = error_detail(&body);
        tracing::debug!("Backend returned {}: {:?}", status, detail);
        return Err(ApiError::Status { status, detail });
    }

    Ok(serde_json::from_str(&body)?)
}

fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;

    ["detail", "message"].iter().find_map(|key| {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    })
}
