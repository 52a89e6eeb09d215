//! Payload filters: SQL-pattern rejection and XSS stripping.
//!
//! Both walk every string value of the query string and of a JSON body,
//! including values nested in objects and arrays. Keys are not inspected.

use std::str::FromStr;

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header::CONTENT_LENGTH, request::Parts, uri::PathAndQuery, HeaderValue, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use super::ip::client_ip;
use super::validation::is_json_content_type;
use crate::error::error_body;
use crate::state::AppState;

lazy_static! {
    static ref SQL_PATTERNS: Vec<Regex> = [
        r"(?i)(\bunion\b.*\bselect\b)|(\bselect\b.*\bunion\b)",
        r"(?i)(\bdrop\b.*\btable\b)|(\btable\b.*\bdrop\b)",
        r"(?i)(\binsert\b.*\binto\b)|(\binto\b.*\binsert\b)",
        r"(?i)(\bdelete\b.*\bfrom\b)|(\bfrom\b.*\bdelete\b)",
        r"(?i)(\bupdate\b.*\bset\b)|(\bset\b.*\bupdate\b)",
        r"(?i)(\bor\b.*1\s*=\s*1)|(\band\b.*1\s*=\s*1)",
        r"(?i)(\bor\b.*\btrue\b)|(\band\b.*\bfalse\b)",
        r"(?i)('.*;\s*--)|('.*;\s*#)",
        r"(?i)(\bexec\b)|(\bexecute\b)|(\bsp_\w+)",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect();

    // Applied in order; each match is removed
    static ref XSS_PATTERNS: Vec<Regex> = [
        r"(?is)<script\b.*?</script>",
        r"(?is)<iframe\b.*?</iframe>",
        r"(?i)javascript:",
        r"(?i)on\w+\s*=",
        r"(?i)<img[^>]+src[^>]*>",
        r"(?is)<object\b.*?</object>",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect();
}

pub fn contains_sql_injection(input: &str) -> bool {
    SQL_PATTERNS.iter().any(|re| re.is_match(input))
}

/// Removes every XSS pattern match from `input`.
pub fn sanitize_xss(input: &str) -> String {
    let mut out = input.to_string();
    for re in XSS_PATTERNS.iter() {
        if re.is_match(&out) {
            out = re.replace_all(&out, "").into_owned();
        }
    }
    out
}

/// True when any string inside `value` matches a SQL pattern.
pub fn json_contains_sql_injection(value: &Value) -> bool {
    match value {
        Value::String(s) => contains_sql_injection(s),
        Value::Array(items) => items.iter().any(json_contains_sql_injection),
        Value::Object(map) => map.values().any(json_contains_sql_injection),
        _ => false,
    }
}

/// Sanitizes every string inside `value` in place. Returns whether anything changed.
pub fn sanitize_json(value: &mut Value) -> bool {
    match value {
        Value::String(s) => {
            let cleaned = sanitize_xss(s);
            if cleaned != *s {
                *s = cleaned;
                true
            } else {
                false
            }
        }
        Value::Array(items) => items.iter_mut().fold(false, |changed, v| sanitize_json(v) || changed),
        Value::Object(map) => map.values_mut().fold(false, |changed, v| sanitize_json(v) || changed),
        _ => false,
    }
}

fn query_pairs(query: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(query.as_bytes()).into_owned().collect()
}

pub fn query_contains_sql_injection(query: &str) -> bool {
    query_pairs(query).iter().any(|(_, v)| contains_sql_injection(v))
}

/// Re-encoded query with sanitized values, or `None` when nothing matched.
pub fn sanitize_query(query: &str) -> Option<String> {
    let pairs = query_pairs(query);
    let mut changed = false;
    let cleaned: Vec<(String, String)> = pairs
        .into_iter()
        .map(|(k, v)| {
            let s = sanitize_xss(&v);
            changed |= s != v;
            (k, s)
        })
        .collect();
    if !changed {
        return None;
    }
    Some(url::form_urlencoded::Serializer::new(String::new()).extend_pairs(cleaned).finish())
}

fn payload_too_large(max: usize) -> Response {
    (
        StatusCode::PAYLOAD_TOO_LARGE,
        Json(error_body(
            StatusCode::PAYLOAD_TOO_LARGE,
            "PAYLOAD_TOO_LARGE",
            &format!("Request body exceeds maximum size of {} bytes", max),
        )),
    )
        .into_response()
}

/// Buffers the body of a JSON request.
async fn buffer_body(req: Request, max: usize) -> Result<(Parts, Bytes), Response> {
    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, max).await.map_err(|_| payload_too_large(max))?;
    Ok((parts, bytes))
}

/// Rejects requests with SQL-looking strings in the query or JSON body.
pub async fn sql_injection_guard(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let ip = client_ip(&req, state.config.security.trust_proxy_hops);

    if let Some(query) = req.uri().query() {
        if query_contains_sql_injection(query) {
            tracing::warn!(target: "security", %ip, "SQL injection attempt detected in query params");
            state.metrics.inc_sql_injection_rejections();
            return (
                StatusCode::BAD_REQUEST,
                Json(error_body(StatusCode::BAD_REQUEST, "INVALID_REQUEST_PARAMETERS", "Invalid request parameters")),
            )
                .into_response();
        }
    }

    if !is_json_content_type(req.headers()) {
        return next.run(req).await;
    }

    let (parts, bytes) = match buffer_body(req, state.config.security.max_body_bytes).await {
        Ok(buffered) => buffered,
        Err(res) => return res,
    };

    if let Ok(value) = serde_json::from_slice::<Value>(&bytes) {
        if json_contains_sql_injection(&value) {
            tracing::warn!(target: "security", %ip, "SQL injection attempt detected in request body");
            state.metrics.inc_sql_injection_rejections();
            return (
                StatusCode::BAD_REQUEST,
                Json(error_body(StatusCode::BAD_REQUEST, "INVALID_REQUEST_DATA", "Invalid request data")),
            )
                .into_response();
        }
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

fn with_query(uri: &Uri, query: &str) -> Option<Uri> {
    let mut parts = uri.clone().into_parts();
    let pq = if query.is_empty() { uri.path().to_string() } else { format!("{}?{}", uri.path(), query) };
    parts.path_and_query = Some(PathAndQuery::from_str(&pq).ok()?);
    Uri::from_parts(parts).ok()
}

/// Strips XSS patterns from query values and JSON body strings, then continues.
pub async fn xss_sanitizer(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let ip = client_ip(&req, state.config.security.trust_proxy_hops);
    let mut sanitized = false;

    if let Some(cleaned) = req.uri().query().and_then(sanitize_query) {
        if let Some(uri) = with_query(req.uri(), &cleaned) {
            *req.uri_mut() = uri;
            sanitized = true;
        }
    }

    let req = if is_json_content_type(req.headers()) {
        let (mut parts, bytes) = match buffer_body(req, state.config.security.max_body_bytes).await {
            Ok(buffered) => buffered,
            Err(res) => return res,
        };
        let bytes = match serde_json::from_slice::<Value>(&bytes) {
            Ok(mut value) => {
                if sanitize_json(&mut value) {
                    match serde_json::to_vec(&value) {
                        Ok(encoded) => {
                            sanitized = true;
                            parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(encoded.len()));
                            Bytes::from(encoded)
                        }
                        Err(_) => bytes,
                    }
                } else {
                    bytes
                }
            }
            Err(_) => bytes,
        };
        Request::from_parts(parts, Body::from(bytes))
    } else {
        req
    };

    if sanitized {
        tracing::warn!(target: "security", %ip, "XSS attempt detected and sanitized");
        state.metrics.inc_xss_sanitizations();
    }

    next.run(req).await
}
