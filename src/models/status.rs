use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    // waiting, partially_paid, empty and unknown statuses
    Awaiting,
    Confirming,
    Confirmed,
    Finished,
    Failed,
    Expired,
    Refunded,
}

impl PaymentStatus {
    pub fn parse(raw: Option<&str>) -> Self {
        let status = raw.unwrap_or("").trim().to_lowercase();
        match status.as_str() {
            "confirming" => PaymentStatus::Confirming,
            "confirmed" => PaymentStatus::Confirmed,
            "finished" => PaymentStatus::Finished,
            "failed" => PaymentStatus::Failed,
            "expired" => PaymentStatus::Expired,
            "refunded" => PaymentStatus::Refunded,
            _ => PaymentStatus::Awaiting,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, PaymentStatus::Confirmed | PaymentStatus::Finished)
    }

    pub fn is_failure(self) -> bool {
        matches!(
            self,
            PaymentStatus::Failed | PaymentStatus::Expired | PaymentStatus::Refunded
        )
    }

    pub fn is_terminal(self) -> bool {
        self.is_success() || self.is_failure()
    }

    pub fn view(self) -> StatusView {
        if self.is_success() {
            StatusView {
                icon: "🟢",
                label: "Payment received",
                tone: Tone::Success,
            }
        } else if self == PaymentStatus::Confirming {
            StatusView {
                icon: "🔵",
                label: "Network confirmation",
                tone: Tone::Info,
            }
        } else if self.is_failure() {
            StatusView {
                icon: "🔴",
                label: "Time expired / payment cancelled",
                tone: Tone::Danger,
            }
        } else {
            StatusView {
                icon: "🟡",
                label: "Awaiting payment",
                tone: Tone::Warning,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Success,
    Info,
    Danger,
    Warning,
}

impl Tone {
    pub fn as_str(self) -> &'static str {
        match self {
            Tone::Success => "success",
            Tone::Info => "info",
            Tone::Danger => "danger",
            Tone::Warning => "warning",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusView {
    pub icon: &'static str,
    pub label: &'static str,
    pub tone: Tone,
}

pub fn status_view(raw: Option<&str>) -> StatusView {
    PaymentStatus::parse(raw).view()
}
