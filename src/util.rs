use axum::http::{HeaderMap, header};

pub fn get_header(headers: &HeaderMap, key: impl header::AsHeaderName) -> Option<String> {
    headers
        .get(key)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

pub fn get_ua(headers: &HeaderMap) -> String {
    get_header(headers, header::USER_AGENT).unwrap_or_else(|| "-".to_string())
}
