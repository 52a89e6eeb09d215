use axum::{
    extract::{Request, State},
    http::{header::CONTENT_LENGTH, header::CONTENT_TYPE, HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use super::ip::client_ip;
use crate::error::error_body;
use crate::state::AppState;

const FORWARDING_HEADERS: [&str; 3] = ["x-forwarded-for", "x-real-ip", "x-originating-ip"];

/// Declared body length, when the header is present and numeric.
fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers.get(CONTENT_LENGTH)?.to_str().ok()?.trim().parse().ok()
}

/// Rejects requests whose declared `Content-Length` exceeds the configured limit.
pub async fn limit_request_size(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let max = state.config.security.max_body_bytes;
    if let Some(length) = declared_length(req.headers()) {
        if length > max {
            let ip = client_ip(&req, state.config.security.trust_proxy_hops);
            tracing::warn!(target: "security", %ip, length, "Request size limit exceeded");
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(error_body(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "PAYLOAD_TOO_LARGE",
                    &format!("Request body exceeds maximum size of {} bytes", max),
                )),
            )
                .into_response();
        }
    }
    next.run(req).await
}

pub fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"))
}

/// Number of distinct client-forwarding headers present.
pub fn forwarding_header_count(headers: &HeaderMap) -> usize {
    FORWARDING_HEADERS.iter().filter(|h| headers.contains_key(**h)).count()
}

/// `POST`/`PUT` under `/api/` must be JSON; stacked forwarding headers are logged.
pub async fn validate_request_headers(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let needs_json = matches!(*req.method(), Method::POST | Method::PUT) && req.uri().path().starts_with("/api/");
    if needs_json && !is_json_content_type(req.headers()) {
        let ip = client_ip(&req, state.config.security.trust_proxy_hops);
        let ct = req.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or("<none>");
        tracing::warn!(
            target: "security",
            %ip,
            content_type = %sanitize_for_logging(ct),
            "Blocked request with invalid content type"
        );
        return (
            StatusCode::BAD_REQUEST,
            Json(error_body(StatusCode::BAD_REQUEST, "INVALID_CONTENT_TYPE", "Invalid content type")),
        )
            .into_response();
    }

    if forwarding_header_count(req.headers()) > 1 {
        let ip = client_ip(&req, state.config.security.trust_proxy_hops);
        tracing::warn!(target: "security", %ip, "Suspicious forwarded headers detected");
    }

    next.run(req).await
}

/// Sanitizes user input for logging purposes.
///
/// Removes control characters, limits the length to 200 characters and
/// escapes quotes and backslashes.
pub fn sanitize_for_logging(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .take(200)
        .collect::<String>()
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\'', "\\\'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn content_type_detection() {
        let mut h = HeaderMap::new();
        assert!(!is_json_content_type(&h));
        h.insert(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"));
        assert!(is_json_content_type(&h));
        h.insert(CONTENT_TYPE, HeaderValue::from_static("Application/JSON"));
        assert!(is_json_content_type(&h));
        h.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert!(!is_json_content_type(&h));
    }

    #[test]
    fn declared_length_parsing() {
        let mut h = HeaderMap::new();
        assert_eq!(declared_length(&h), None);
        h.insert(CONTENT_LENGTH, HeaderValue::from_static("1048577"));
        assert_eq!(declared_length(&h), Some(1_048_577));
        h.insert(CONTENT_LENGTH, HeaderValue::from_static("lots"));
        assert_eq!(declared_length(&h), None);
    }

    #[test]
    fn counts_forwarding_headers() {
        let mut h = HeaderMap::new();
        h.insert("x-forwarded-for", HeaderValue::from_static("1.2.3.4"));
        assert_eq!(forwarding_header_count(&h), 1);
        h.insert("x-originating-ip", HeaderValue::from_static("5.6.7.8"));
        assert_eq!(forwarding_header_count(&h), 2);
    }

    #[test]
    fn test_sanitize_for_logging() {
        assert_eq!(sanitize_for_logging("normal text"), "normal text");
        assert_eq!(sanitize_for_logging("text\nwith\nnewlines"), "text\nwith\nnewlines");

        let sanitized = sanitize_for_logging("text\x00with\x01control\x02chars");
        assert!(!sanitized.contains('\x00'));
        assert!(!sanitized.contains('\x01'));

        let long_text = "a".repeat(300);
        assert_eq!(sanitize_for_logging(&long_text).len(), 200);
        assert_eq!(sanitize_for_logging("say \"hi\""), "say \\\"hi\\\"");
    }
}
