//! Per-process tracker of misbehaving clients.
//!
//! Failed responses accumulate against the client IP. Crossing the temporary
//! threshold bans the IP for a while; crossing the permanent threshold adds it
//! to the blocklist for the lifetime of the process. Successful responses pay
//! the count back down.

use std::{
    collections::{HashMap, HashSet},
    net::IpAddr,
    sync::Arc,
    time::Instant,
};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::config::Environment;

/// Thresholds applied by [`SecurityMonitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuspicionPolicy {
    pub temp_threshold: u32,
    pub permanent_threshold: u32,
    pub temp_ban: Duration,
    pub exempt_loopback: bool,
}

impl SuspicionPolicy {
    pub fn for_environment(env: Environment) -> Self {
        if env.is_development() {
            Self {
                temp_threshold: 25,
                permanent_threshold: 100,
                temp_ban: Duration::minutes(5),
                exempt_loopback: true,
            }
        } else {
            Self {
                temp_threshold: 10,
                permanent_threshold: 50,
                temp_ban: Duration::minutes(30),
                exempt_loopback: false,
            }
        }
    }
}

/// Verdict of [`SecurityMonitor::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Blocked,
    TemporarilyBlocked { retry_after_seconds: u64 },
}

/// What a recorded outcome changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    None,
    TemporaryBan,
    PermanentBan,
}

#[derive(Debug, Clone)]
struct SuspiciousEntry {
    attempts: u32,
    last_attempt: DateTime<Utc>,
    blocked_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct MonitorState {
    blocked: HashSet<IpAddr>,
    suspicious: HashMap<IpAddr, SuspiciousEntry>,
}

/// Which audience a status report is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusView {
    /// Masked addresses, short lists.
    Public,
    /// Full addresses, longer lists.
    Admin,
}

impl StatusView {
    fn limits(self) -> (usize, usize) {
        match self {
            StatusView::Public => (10, 20),
            StatusView::Admin => (100, 100),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BlockedIps {
    pub count: usize,
    pub list: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub ip: String,
    pub attempts: u32,
    pub last_attempt: DateTime<Utc>,
    pub blocked_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspiciousIps {
    pub count: usize,
    pub recent_activity: Vec<ActivityEntry>,
}

#[derive(Debug, Serialize)]
pub struct SecurityStatus {
    #[serde(rename = "blockedIPs")]
    pub blocked_ips: BlockedIps,
    #[serde(rename = "suspiciousIPs")]
    pub suspicious_ips: SuspiciousIps,
    pub timestamp: DateTime<Utc>,
    /// Seconds since the monitor was created.
    pub uptime: f64,
}

/// Hides the host part of an address: last IPv4 octet or last IPv6 group.
pub fn mask_ip(ip: &IpAddr) -> String {
    let text = ip.to_string();
    let sep = if ip.is_ipv4() { '.' } else { ':' };
    match text.rfind(sep) {
        Some(idx) => format!("{}{}***", &text[..idx], sep),
        None => "***".to_string(),
    }
}

/// Shared blocklist and failure counters.
#[derive(Clone)]
pub struct SecurityMonitor {
    inner: Arc<RwLock<MonitorState>>,
    policy: SuspicionPolicy,
    started: Instant,
}

impl SecurityMonitor {
    pub fn new(policy: SuspicionPolicy) -> Self {
        Self { inner: Arc::new(RwLock::new(MonitorState::default())), policy, started: Instant::now() }
    }

    pub async fn check(&self, ip: IpAddr) -> Access {
        self.check_at(ip, Utc::now()).await
    }

    pub async fn check_at(&self, ip: IpAddr, now: DateTime<Utc>) -> Access {
        let state = self.inner.read().await;
        if state.blocked.contains(&ip) {
            return Access::Blocked;
        }
        match state.suspicious.get(&ip).and_then(|e| e.blocked_until) {
            Some(until) if until > now => {
                let millis = (until - now).num_milliseconds().max(0) as u64;
                Access::TemporarilyBlocked { retry_after_seconds: millis.div_ceil(1000) }
            }
            _ => Access::Allowed,
        }
    }

    pub async fn is_blocked(&self, ip: IpAddr) -> bool {
        self.inner.read().await.blocked.contains(&ip)
    }

    /// Adds `ip` to the permanent blocklist. Returns false when it already was.
    pub async fn block(&self, ip: IpAddr) -> bool {
        self.inner.write().await.blocked.insert(ip)
    }

    pub async fn record_outcome(&self, ip: IpAddr, status: u16) -> Escalation {
        self.record_outcome_at(ip, status, Utc::now()).await
    }

    pub async fn record_outcome_at(&self, ip: IpAddr, status: u16, now: DateTime<Utc>) -> Escalation {
        let mut state = self.inner.write().await;

        if status < 400 {
            if let Some(entry) = state.suspicious.get_mut(&ip) {
                entry.attempts = entry.attempts.saturating_sub(1);
                if entry.attempts == 0 {
                    state.suspicious.remove(&ip);
                }
            }
            return Escalation::None;
        }

        let entry = state.suspicious.entry(ip).or_insert(SuspiciousEntry {
            attempts: 0,
            last_attempt: now,
            blocked_until: None,
        });
        entry.attempts = entry.attempts.saturating_add(1);
        entry.last_attempt = now;
        let attempts = entry.attempts;

        let mut escalation = Escalation::None;
        if attempts >= self.policy.temp_threshold {
            let already_banned = entry.blocked_until.is_some_and(|until| until > now);
            entry.blocked_until = Some(now + self.policy.temp_ban);
            if !already_banned {
                tracing::warn!(
                    target: "security",
                    %ip,
                    attempts,
                    ban_minutes = self.policy.temp_ban.num_minutes(),
                    "Temporarily blocked IP after repeated failures"
                );
                escalation = Escalation::TemporaryBan;
            }
        }

        if attempts >= self.policy.permanent_threshold {
            if self.policy.exempt_loopback && ip.is_loopback() {
                tracing::debug!(target: "security", %ip, attempts, "Loopback exempt from permanent block");
            } else if state.blocked.insert(ip) {
                tracing::warn!(target: "security", %ip, attempts, "Permanently blocked IP");
                escalation = Escalation::PermanentBan;
            }
        }

        escalation
    }

    /// Drops entries idle for over an hour whose ban (if any) has lapsed.
    pub async fn sweep(&self) -> usize {
        self.sweep_at(Utc::now()).await
    }

    pub async fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut state = self.inner.write().await;
        let before = state.suspicious.len();
        let cutoff = now - Duration::hours(1);
        state.suspicious.retain(|_, e| {
            let banned = e.blocked_until.is_some_and(|until| until > now);
            banned || e.last_attempt >= cutoff
        });
        before - state.suspicious.len()
    }

    pub async fn snapshot(&self, view: StatusView) -> SecurityStatus {
        self.snapshot_at(view, Utc::now()).await
    }

    pub async fn snapshot_at(&self, view: StatusView, now: DateTime<Utc>) -> SecurityStatus {
        let state = self.inner.read().await;
        let (max_blocked, max_recent) = view.limits();
        let render = |ip: &IpAddr| match view {
            StatusView::Public => mask_ip(ip),
            StatusView::Admin => ip.to_string(),
        };

        let mut blocked: Vec<&IpAddr> = state.blocked.iter().collect();
        blocked.sort();
        let list = blocked.into_iter().take(max_blocked).map(render).collect();

        let day_ago = now - Duration::hours(24);
        let mut recent: Vec<(&IpAddr, &SuspiciousEntry)> =
            state.suspicious.iter().filter(|(_, e)| e.last_attempt > day_ago).collect();
        recent.sort_by(|a, b| b.1.last_attempt.cmp(&a.1.last_attempt));
        let recent_activity = recent
            .into_iter()
            .take(max_recent)
            .map(|(ip, e)| ActivityEntry {
                ip: render(ip),
                attempts: e.attempts,
                last_attempt: e.last_attempt,
                blocked_until: e.blocked_until,
            })
            .collect();

        SecurityStatus {
            blocked_ips: BlockedIps { count: state.blocked.len(), list },
            suspicious_ips: SuspiciousIps { count: state.suspicious.len(), recent_activity },
            timestamp: now,
            uptime: self.started.elapsed().as_secs_f64(),
        }
    }
}
