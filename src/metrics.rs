use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Security and storefront counters
#[derive(Clone)]
pub struct Metrics {
    pub requests_inspected: Arc<AtomicU64>,
    pub honeypot_hits: Arc<AtomicU64>,
    pub blocked_requests: Arc<AtomicU64>,
    pub sql_injection_rejections: Arc<AtomicU64>,
    pub xss_sanitizations: Arc<AtomicU64>,
    pub csrf_rejections: Arc<AtomicU64>,
    pub bot_rejections: Arc<AtomicU64>,
    pub rate_limited: Arc<AtomicU64>,
    pub temporary_bans: Arc<AtomicU64>,
    pub permanent_bans: Arc<AtomicU64>,
    pub cart_additions: Arc<AtomicU64>,
    pub admin_logins: Arc<AtomicU64>,
    pub admin_login_failures: Arc<AtomicU64>,
    pub start_time: Instant,
}

fn counter() -> Arc<AtomicU64> {
    Arc::new(AtomicU64::new(0))
}

fn bump(c: &AtomicU64) {
    c.fetch_add(1, Ordering::Relaxed);
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            requests_inspected: counter(),
            honeypot_hits: counter(),
            blocked_requests: counter(),
            sql_injection_rejections: counter(),
            xss_sanitizations: counter(),
            csrf_rejections: counter(),
            bot_rejections: counter(),
            rate_limited: counter(),
            temporary_bans: counter(),
            permanent_bans: counter(),
            cart_additions: counter(),
            admin_logins: counter(),
            admin_login_failures: counter(),
            start_time: Instant::now(),
        }
    }

    pub fn inc_requests_inspected(&self) {
        bump(&self.requests_inspected);
    }

    pub fn inc_honeypot_hits(&self) {
        bump(&self.honeypot_hits);
    }

    pub fn inc_blocked_requests(&self) {
        bump(&self.blocked_requests);
    }

    pub fn inc_sql_injection_rejections(&self) {
        bump(&self.sql_injection_rejections);
    }

    pub fn inc_xss_sanitizations(&self) {
        bump(&self.xss_sanitizations);
    }

    pub fn inc_csrf_rejections(&self) {
        bump(&self.csrf_rejections);
    }

    pub fn inc_bot_rejections(&self) {
        bump(&self.bot_rejections);
    }

    pub fn inc_rate_limited(&self) {
        bump(&self.rate_limited);
    }

    pub fn inc_temporary_bans(&self) {
        bump(&self.temporary_bans);
    }

    pub fn inc_permanent_bans(&self) {
        bump(&self.permanent_bans);
    }

    pub fn inc_cart_additions(&self) {
        bump(&self.cart_additions);
    }

    pub fn inc_admin_logins(&self) {
        bump(&self.admin_logins);
    }

    pub fn inc_admin_login_failures(&self) {
        bump(&self.admin_login_failures);
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        let load = |c: &Arc<AtomicU64>| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            requests_inspected: load(&self.requests_inspected),
            honeypot_hits: load(&self.honeypot_hits),
            blocked_requests: load(&self.blocked_requests),
            sql_injection_rejections: load(&self.sql_injection_rejections),
            xss_sanitizations: load(&self.xss_sanitizations),
            csrf_rejections: load(&self.csrf_rejections),
            bot_rejections: load(&self.bot_rejections),
            rate_limited: load(&self.rate_limited),
            temporary_bans: load(&self.temporary_bans),
            permanent_bans: load(&self.permanent_bans),
            cart_additions: load(&self.cart_additions),
            admin_logins: load(&self.admin_logins),
            admin_login_failures: load(&self.admin_login_failures),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub requests_inspected: u64,
    pub honeypot_hits: u64,
    pub blocked_requests: u64,
    pub sql_injection_rejections: u64,
    pub xss_sanitizations: u64,
    pub csrf_rejections: u64,
    pub bot_rejections: u64,
    pub rate_limited: u64,
    pub temporary_bans: u64,
    pub permanent_bans: u64,
    pub cart_additions: u64,
    pub admin_logins: u64,
    pub admin_login_failures: u64,
    pub uptime_seconds: u64,
}

impl MetricsSnapshot {
    /// `(name, help, type, value)` rows for the Prometheus text exposition.
    pub fn prometheus_rows(&self) -> [(&'static str, &'static str, &'static str, u64); 14] {
        [
            ("requests_inspected", "Requests that entered the security pipeline", "counter", self.requests_inspected),
            ("honeypot_hits", "Requests to trap paths", "counter", self.honeypot_hits),
            ("blocked_requests", "Requests refused by the IP blocklist", "counter", self.blocked_requests),
            ("sql_injection_rejections", "Requests rejected by the SQL pattern scanner", "counter", self.sql_injection_rejections),
            ("xss_sanitizations", "Requests whose payload was sanitized", "counter", self.xss_sanitizations),
            ("csrf_rejections", "Cross-site requests rejected", "counter", self.csrf_rejections),
            ("bot_rejections", "Requests rejected by user-agent filtering", "counter", self.bot_rejections),
            ("rate_limited", "Requests rejected by a rate limiter", "counter", self.rate_limited),
            ("temporary_bans", "Temporary IP bans issued", "counter", self.temporary_bans),
            ("permanent_bans", "Permanent IP bans issued", "counter", self.permanent_bans),
            ("cart_additions", "Items added to carts", "counter", self.cart_additions),
            ("admin_logins", "Successful admin logins", "counter", self.admin_logins),
            ("admin_login_failures", "Failed admin logins", "counter", self.admin_login_failures),
            ("uptime_seconds", "Uptime seconds", "gauge", self.uptime_seconds),
        ]
    }
}
