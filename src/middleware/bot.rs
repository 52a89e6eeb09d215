use axum::{
    extract::{Request, State},
    http::{header::USER_AGENT, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;

use super::ip::client_ip;
use super::validation::sanitize_for_logging;
use crate::error::error_body;
use crate::state::AppState;

lazy_static! {
    static ref BROWSER_PATTERNS: Vec<Regex> = [
        r"(?i)mozilla.*chrome",
        r"(?i)mozilla.*firefox",
        r"(?i)mozilla.*safari",
        r"(?i)mozilla.*edge",
        r"(?i)headlesschrome",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect();
    static ref TOOL_PATTERN: Option<Regex> = Regex::new(
        r"(?i)crawler|spider|scraper|curl|wget|python|java|go-http|phantom|selenium|masscan|nmap|nikto|sqlmap|libwww|lwp-trivial|urllib"
    )
    .ok();
}

/// `bot` anywhere except as the start of `bottom`.
fn mentions_bot(ua: &str) -> bool {
    let lower = ua.to_ascii_lowercase();
    lower.match_indices("bot").any(|(idx, _)| !lower[idx..].starts_with("bottom"))
}

/// Whether a user agent belongs to an automated client.
pub fn is_bot_user_agent(ua: &str) -> bool {
    if BROWSER_PATTERNS.iter().any(|re| re.is_match(ua)) {
        return false;
    }
    ua.trim().is_empty() || mentions_bot(ua) || TOOL_PATTERN.as_ref().is_some_and(|re| re.is_match(ua))
}

/// Rejects scripted clients and scanners by user agent.
pub async fn block_bots(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let ua = req.headers().get(USER_AGENT).and_then(|v| v.to_str().ok()).unwrap_or("");
    if !is_bot_user_agent(ua) {
        return next.run(req).await;
    }

    let ip = client_ip(&req, state.config.security.trust_proxy_hops);
    tracing::warn!(target: "security", %ip, user_agent = %sanitize_for_logging(ua), "Blocked malicious user agent");
    state.metrics.inc_bot_rejections();
    (StatusCode::FORBIDDEN, Json(error_body(StatusCode::FORBIDDEN, "ACCESS_DENIED", "Access denied"))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browsers_pass() {
        assert!(!is_bot_user_agent(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36"
        ));
        assert!(!is_bot_user_agent("Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0"));
        assert!(!is_bot_user_agent("Mozilla/5.0 HeadlessChrome/120.0"));
        // Browser pattern wins even when a bot word is present
        assert!(!is_bot_user_agent("Mozilla/5.0 (compatible; Googlebot/2.1) Chrome/120"));
    }

    #[test]
    fn tools_and_empty_agents_are_blocked() {
        assert!(is_bot_user_agent(""));
        assert!(is_bot_user_agent("   "));
        assert!(is_bot_user_agent("curl/8.4.0"));
        assert!(is_bot_user_agent("python-requests/2.31"));
        assert!(is_bot_user_agent("Go-http-client/1.1"));
        assert!(is_bot_user_agent("sqlmap/1.7"));
        assert!(is_bot_user_agent("Java/17"));
        assert!(is_bot_user_agent("SomeBot/1.0"));
        assert!(is_bot_user_agent("Wget/1.21"));
    }

    #[test]
    fn bottom_is_not_a_bot() {
        assert!(!is_bot_user_agent("BottomFeeder/1.0"));
        assert!(is_bot_user_agent("bottombot"));
        assert!(!is_bot_user_agent("Custom Client"));
    }
}
