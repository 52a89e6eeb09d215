use std::path::Path;

use serde::Deserialize;

/// Deployment profile. Development relaxes rate limits and ban thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub environment: Environment,
    /// Built single-page client. Served as the fallback when present.
    pub static_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub max_body_bytes: usize,
    pub trust_proxy_hops: usize,
    pub trusted_hosts: Vec<String>,
    pub honeypot_paths: Vec<String>,
    pub enable_hsts: Option<bool>,
    pub hsts_max_age: Option<u64>,
    pub hsts_include_subdomains: Option<bool>,
    pub hsts_preload: Option<bool>,
    pub csp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    pub session_ttl_hours: u32,
    pub bootstrap_username: Option<String>,
    pub bootstrap_password: Option<String>,
    pub bootstrap_email: Option<String>,
}

/// One year.
pub const MAX_SESSION_TTL_HOURS: u32 = 24 * 365;

impl AdminConfig {
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.session_ttl_hours))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub seed_on_start: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub admin: AdminConfig,
    pub catalog: CatalogConfig,
}

const DEFAULTS: &str = include_str!("../config/default.toml");

impl Default for AppConfig {
    fn default() -> Self {
        // Fallback: parse the embedded default TOML
        match ::config::Config::builder()
            .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
            .build()
        {
            Ok(cfg) => match cfg.try_deserialize() {
                Ok(app_cfg) => app_cfg,
                Err(e) => panic!("Failed to deserialize default config: {}", e),
            },
            Err(e) => panic!("Failed to parse default config: {}", e),
        }
    }
}

pub fn load() -> anyhow::Result<AppConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();

    let mut builder = ::config::Config::builder()
        .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
        // Optional local file: textile-home.toml (in CWD)
        .add_source(::config::File::with_name("textile-home").required(false));

    if let Ok(custom_path) = std::env::var("TEXTILE_HOME_CONFIG") {
        builder = builder.add_source(::config::File::with_name(&custom_path).required(false));
    }
    // Environment variables last to have highest precedence
    builder = builder.add_source(
        ::config::Environment::with_prefix("TEXTILE_HOME")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("security.trusted_hosts")
            .with_list_parse_key("security.honeypot_paths")
            .try_parsing(true),
    );

    let cfg = builder.build()?;
    let app_cfg: AppConfig = cfg.try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

pub fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    // Server
    if cfg.server.port == 0 {
        return Err(anyhow::anyhow!("invalid server.port: {}", cfg.server.port));
    }
    #[cfg(unix)]
    if cfg.server.port < 1024 {
        tracing::warn!("Using privileged port {} - may require elevated permissions", cfg.server.port);
    }

    // Database
    if cfg.database.max_connections == 0 {
        return Err(anyhow::anyhow!("database.max_connections must be > 0"));
    }

    // Security
    if cfg.security.max_body_bytes == 0 {
        return Err(anyhow::anyhow!("security.max_body_bytes must be > 0"));
    }
    if cfg.security.trust_proxy_hops > 16 {
        return Err(anyhow::anyhow!("security.trust_proxy_hops must be in 0..=16"));
    }

    // Admin
    if cfg.admin.session_ttl_hours == 0 || cfg.admin.session_ttl_hours > MAX_SESSION_TTL_HOURS {
        return Err(anyhow::anyhow!("admin.session_ttl_hours must be in 1..={}", MAX_SESSION_TTL_HOURS));
    }
    let has_user = cfg.admin.bootstrap_username.as_deref().is_some_and(|u| !u.trim().is_empty());
    let has_pass = cfg.admin.bootstrap_password.as_deref().is_some_and(|p| !p.is_empty());
    if has_user && !has_pass {
        return Err(anyhow::anyhow!("admin.bootstrap_password is required when admin.bootstrap_username is set"));
    }

    Ok(())
}

pub fn ensure_sqlite_parent_dir(url: &str) -> anyhow::Result<()> {
    if let Some(path) = url.strip_prefix("sqlite://") {
        let path = path.split('?').next().unwrap_or(path);
        let p = Path::new(path);
        if let Some(parent) = p.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }
    Ok(())
}
