use crate::error::FetchError;
use crate::models::{
    display::{format_amount, format_timer, qr_image_url, wallet_uri},
    Payment, PaymentId, PaymentStatus, StatusView,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Uninitialized,
    Loading,
    Awaiting,
    Succeeded,
    Failed,
    Error,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Succeeded | Phase::Failed)
    }

    fn for_status(status: PaymentStatus) -> Self {
        if status.is_success() {
            Phase::Succeeded
        } else if status.is_failure() {
            Phase::Failed
        } else {
            Phase::Awaiting
        }
    }
}

/// Reported once, when the payment first reaches a terminal status.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub payment: Payment,
    pub success: bool,
}

pub fn compute_expiry(payment: &Payment, now: DateTime<Utc>, default: Duration) -> i64 {
    payment
        .expires_at()
        .map(|at| at.timestamp())
        .unwrap_or_else(|| now.timestamp() + default.as_secs() as i64)
}

#[derive(Debug, Clone)]
pub struct PaymentSession {
    phase: Phase,
    payment: Option<Payment>,
    expires_at: Option<i64>,
    now: i64,
    error: Option<FetchError>,
    default_expiry: Duration,
    pay_currency: String,
}

impl PaymentSession {
    pub fn new(default_expiry: Duration, pay_currency: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            phase: Phase::Uninitialized,
            payment: None,
            expires_at: None,
            now: now.timestamp(),
            error: None,
            default_expiry,
            pay_currency: pay_currency.into(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn payment(&self) -> Option<&Payment> {
        self.payment.as_ref()
    }

    pub fn payment_id(&self) -> Option<PaymentId> {
        self.payment.as_ref().and_then(|p| p.payment_id.clone())
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn begin_loading(&mut self) -> bool {
        if self.phase != Phase::Uninitialized {
            return false;
        }
        self.phase = Phase::Loading;
        self.error = None;
        true
    }

    pub fn fail(&mut self, error: FetchError) {
        if self.phase == Phase::Loading {
            self.phase = Phase::Error;
            self.error = Some(error);
        }
    }

    pub fn start(&mut self, payment: Payment, now: DateTime<Utc>) -> Option<Completion> {
        if self.phase != Phase::Loading {
            return None;
        }

        self.now = now.timestamp();
        self.expires_at = Some(compute_expiry(&payment, now, self.default_expiry));
        self.payment = Some(payment);
        self.settle()
    }

    pub fn apply_poll(&mut self, remote: Payment, now: DateTime<Utc>) -> Option<Completion> {
        if self.phase != Phase::Awaiting {
            return None;
        }

        if let Some(at) = remote.expires_at() {
            self.expires_at = Some(at.timestamp());
        }
        self.now = now.timestamp();

        match self.payment.as_mut() {
            Some(local) => local.merge(remote),
            None => self.payment = Some(remote),
        }
        self.settle()
    }

    pub fn tick(&mut self, now: DateTime<Utc>) {
        self.now = now.timestamp();
    }

    pub fn seconds_remaining(&self) -> u64 {
        match self.expires_at {
            Some(expires_at) => expires_at.saturating_sub(self.now).max(0) as u64,
            None => self.default_expiry.as_secs(),
        }
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            phase: self.phase,
            payment: self.payment.clone(),
            seconds_remaining: self.seconds_remaining(),
            error: self.error.clone(),
            pay_currency: self.pay_currency.clone(),
        }
    }

    fn settle(&mut self) -> Option<Completion> {
        let payment = self.payment.as_ref()?;
        let status = payment.status();
        self.phase = Phase::for_status(status);

        if status.is_terminal() {
            tracing::info!(
                payment_id = ?payment.payment_id,
                status = ?status,
                "Payment reached terminal status"
            );
            Some(Completion {
                payment: payment.clone(),
                success: status.is_success(),
            })
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerSnapshot {
    pub phase: Phase,
    pub payment: Option<Payment>,
    pub seconds_remaining: u64,
    pub error: Option<FetchError>,
    pub pay_currency: String,
}

impl TrackerSnapshot {
    pub fn status(&self) -> PaymentStatus {
        PaymentStatus::parse(self.payment.as_ref().and_then(|p| p.payment_status.as_deref()))
    }

    pub fn status_view(&self) -> StatusView {
        self.status().view()
    }

    pub fn formatted_timer(&self) -> String {
        format_timer(self.seconds_remaining)
    }

    pub fn shows_timer(&self) -> bool {
        self.phase == Phase::Awaiting
    }

    pub fn can_retry(&self) -> bool {
        self.error.is_some() && self.payment.is_none()
    }

    pub fn pay_address(&self) -> &str {
        self.payment.as_ref().map(Payment::pay_address).unwrap_or("")
    }

    pub fn pay_amount(&self) -> Option<f64> {
        self.payment.as_ref().and_then(|p| p.pay_amount)
    }

    pub fn pay_amount_text(&self) -> String {
        format_amount(self.pay_amount())
    }

    fn raw_pay_currency(&self) -> &str {
        self.payment
            .as_ref()
            .and_then(|p| p.pay_currency.as_deref())
            .filter(|currency| !currency.is_empty())
            .unwrap_or(&self.pay_currency)
    }

    pub fn pay_currency_label(&self) -> String {
        self.raw_pay_currency().to_uppercase()
    }

    pub fn wallet_uri(&self) -> String {
        wallet_uri(self.pay_address(), self.pay_amount(), self.raw_pay_currency())
    }

    pub fn qr_payload(&self) -> String {
        let uri = self.wallet_uri();
        if uri.is_empty() {
            self.pay_address().to_string()
        } else {
            uri
        }
    }

    pub fn qr_url(&self, service_url: &str) -> Option<String> {
        qr_image_url(service_url, &self.qr_payload())
    }
}
