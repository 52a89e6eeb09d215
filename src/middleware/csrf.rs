//! Cross-Site Request Forgery (CSRF) protection middleware.
//!
//! State-changing requests must come from a page served by this host (or one
//! of the configured trusted hosts), as witnessed by `Origin` or `Referer`.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use super::ip::client_ip;
use super::validation::sanitize_for_logging;
use crate::error::error_body;
use crate::state::AppState;

fn header_str<'a>(headers: &'a HeaderMap, name: header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// `host[:port]` of an absolute URL.
fn url_authority(raw: &str) -> Option<String> {
    let url = url::Url::parse(raw).ok()?;
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Whether a request with these headers is same-site.
pub fn is_same_origin(headers: &HeaderMap, trusted_hosts: &[String]) -> bool {
    let host = header_str(headers, header::HOST);
    let allowed: Vec<&str> = host.into_iter().chain(trusted_hosts.iter().map(String::as_str)).collect();

    if let Some(origin) = header_str(headers, header::ORIGIN) {
        let ok = allowed
            .iter()
            .any(|h| origin == format!("http://{}", h) || origin == format!("https://{}", h));
        if ok {
            return true;
        }
    }

    if let Some(referer_host) = header_str(headers, header::REFERER).and_then(url_authority) {
        if allowed.iter().any(|h| referer_host.eq_ignore_ascii_case(h)) {
            return true;
        }
    }

    false
}

/// Rejects non-safe methods whose origin is not this site.
pub async fn csrf_protection(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if matches!(*req.method(), Method::GET | Method::HEAD | Method::OPTIONS) {
        return next.run(req).await;
    }

    if is_same_origin(req.headers(), &state.config.security.trusted_hosts) {
        return next.run(req).await;
    }

    let ip = client_ip(&req, state.config.security.trust_proxy_hops);
    let origin = header_str(req.headers(), header::ORIGIN).map(sanitize_for_logging);
    let referer = header_str(req.headers(), header::REFERER).map(sanitize_for_logging);
    tracing::warn!(target: "security", %ip, ?origin, ?referer, "CSRF attempt blocked");
    state.metrics.inc_csrf_rejections();

    (
        StatusCode::FORBIDDEN,
        Json(error_body(StatusCode::FORBIDDEN, "CROSS_SITE_REQUEST_BLOCKED", "Cross-site request blocked")),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::HeaderValue;

    fn trusted() -> Vec<String> {
        vec!["localhost:5000".to_string()]
    }

    fn headers(pairs: &[(header::HeaderName, &'static str)]) -> HeaderMap {
        let mut h = HeaderMap::new();
        for (k, v) in pairs {
            h.insert(k.clone(), HeaderValue::from_static(v));
        }
        h
    }

    #[test]
    fn origin_must_match_host_or_trusted() {
        let h = headers(&[(header::HOST, "shop.example"), (header::ORIGIN, "https://shop.example")]);
        assert!(is_same_origin(&h, &trusted()));

        let h = headers(&[(header::HOST, "shop.example"), (header::ORIGIN, "http://localhost:5000")]);
        assert!(is_same_origin(&h, &trusted()));

        let h = headers(&[(header::HOST, "shop.example"), (header::ORIGIN, "https://evil.example")]);
        assert!(!is_same_origin(&h, &trusted()));

        // Prefix tricks do not pass
        let h = headers(&[(header::HOST, "shop.example"), (header::ORIGIN, "https://shop.example.evil.io")]);
        assert!(!is_same_origin(&h, &trusted()));
    }

    #[test]
    fn referer_host_is_compared() {
        let h = headers(&[(header::HOST, "shop.example"), (header::REFERER, "https://shop.example/cart?x=1")]);
        assert!(is_same_origin(&h, &trusted()));

        let h = headers(&[(header::HOST, "shop.example"), (header::REFERER, "http://localhost:5000/admin")]);
        assert!(is_same_origin(&h, &trusted()));

        let h = headers(&[(header::HOST, "shop.example"), (header::REFERER, "https://evil.example/")]);
        assert!(!is_same_origin(&h, &trusted()));

        let h = headers(&[(header::HOST, "shop.example"), (header::REFERER, "not a url")]);
        assert!(!is_same_origin(&h, &trusted()));
    }

    #[test]
    fn missing_headers_fail() {
        assert!(!is_same_origin(&headers(&[(header::HOST, "shop.example")]), &trusted()));
        assert!(!is_same_origin(&HeaderMap::new(), &[]));
    }
}
