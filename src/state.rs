use std::sync::Arc;

use crate::config::AppConfig;
use crate::metrics::Metrics;
use crate::middleware::{RateLimitTiers, RateLimiters};
use crate::monitor::{SecurityMonitor, SuspicionPolicy};

/// The shared application state.
///
/// Cloned into every handler and security layer. All members are cheap
/// handles over shared data.
#[derive(Clone)]
pub struct AppState {
    /// The database connection pool.
    pub db: sqlx::SqlitePool,
    /// The application configuration.
    pub config: Arc<AppConfig>,
    /// Security and storefront counters.
    pub metrics: Metrics,
    /// Blocklist and failure tracking.
    pub monitor: SecurityMonitor,
    /// Global and per-prefix rate limiters.
    pub limiters: RateLimiters,
}

impl AppState {
    /// Creates the state with thresholds and limits picked for `server.environment`.
    ///
    /// | | production | development |
    /// |---|---|---|
    /// | strict limit | 30 / 60 s | 100 / 60 s |
    /// | general limit | 200 / 15 min | 500 / 15 min |
    /// | `/api/cart` failures | 15 / 5 min | 50 / 5 min |
    /// | `/api/products/search` | 10 / 60 s | 30 / 60 s |
    pub fn new(db: sqlx::SqlitePool, config: AppConfig) -> Self {
        let env = config.server.environment;
        Self {
            db,
            config: Arc::new(config),
            metrics: Metrics::new(),
            monitor: SecurityMonitor::new(SuspicionPolicy::for_environment(env)),
            limiters: RateLimiters::new(RateLimitTiers::for_environment(env)),
        }
    }
}
