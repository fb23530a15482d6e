use reqwest::Url;

pub const QR_SERVICE_URL: &str = "https://api.qrserver.com/v1/create-qr-code/";
const QR_SIZE: &str = "240x240";

pub fn format_amount(value: Option<f64>) -> String {
    match value {
        Some(value) if value.is_finite() => format!("{:.5}", value),
        _ => "—".to_string(),
    }
}

pub fn format_timer(seconds_left: u64) -> String {
    format!("{:02}:{:02}", seconds_left / 60, seconds_left % 60)
}

pub fn price_line(amount: f64, price_currency: &str) -> String {
    let currency = price_currency.trim().to_lowercase();
    match currency.as_str() {
        "usd" => format!("${}", amount),
        "eur" => format!("€{}", amount),
        "" => format!("{} USD", amount),
        other => format!("{} {}", amount, other.to_uppercase()),
    }
}

pub fn title_line(title: Option<&str>, order_id: &str) -> String {
    match title.map(str::trim) {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => format!("Order {}", order_id),
    }
}

pub fn is_trc20(address: &str, currency: &str) -> bool {
    currency.to_lowercase().contains("trc20") || address.starts_with('T')
}

pub fn wallet_uri(address: &str, amount: Option<f64>, currency: &str) -> String {
    if address.is_empty() {
        return String::new();
    }

    if !is_trc20(address, currency) {
        return address.to_string();
    }

    match amount {
        Some(amount) if amount != 0.0 && amount.is_finite() => {
            format!("tron:{}?amount={}", address, amount)
        }
        _ => format!("tron:{}", address),
    }
}

pub fn qr_image_url(service_url: &str, payload: &str) -> Option<String> {
    if payload.is_empty() {
        return None;
    }

    Url::parse_with_params(service_url, &[("size", QR_SIZE), ("data", payload)])
        .map(String::from)
        .map_err(|e| tracing::warn!("Invalid QR service URL {}: {}", service_url, e))
        .ok()
}
