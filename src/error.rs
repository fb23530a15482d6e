use reqwest::StatusCode;
use thiserror::Error;

pub const TIMEOUT_MESSAGE: &str = "The server did not respond in time. Please try again.";
pub const CREATE_FAILED_MESSAGE: &str = "Failed to create payment";
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load payment";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request timed out")]
    Timeout,

    #[error("HTTP {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Status {
        status: StatusCode,
        detail: Option<String>,
    },

    #[error("Invalid response body: {0}")]
    Decode(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Create,
    Lookup,
}

impl FetchKind {
    fn fallback_message(self) -> &'static str {
        match self {
            FetchKind::Create => CREATE_FAILED_MESSAGE,
            FetchKind::Lookup => LOAD_FAILED_MESSAGE,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("{}", TIMEOUT_MESSAGE)]
    Timeout,

    #[error("{0}")]
    Failed(String),
}

impl FetchError {
    pub fn from_api(kind: FetchKind, err: &ApiError) -> Self {
        match err {
            ApiError::Timeout => FetchError::Timeout,
            ApiError::Status {
                detail: Some(detail),
                ..
            } if !detail.trim().is_empty() => FetchError::Failed(detail.clone()),
            _ => FetchError::Failed(kind.fallback_message().to_string()),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout)
    }
}

#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("No clipboard program available")]
    Unavailable,

    #[error("Clipboard program `{program}` failed: {reason}")]
    Command { program: String, reason: String },

    #[error("Clipboard I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CopyError {
    #[error("Failed to copy address")]
    Address,

    #[error("Failed to copy amount")]
    Amount,
}
