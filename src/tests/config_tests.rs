use std::env;
use std::fs;

use crate::config::{self, AppConfig, Environment};

// Single test so the process-wide environment isn't raced by parallel tests.
#[test]
fn test_load_layers_file_and_environment() {
    let result = config::load();
    assert!(result.is_ok());

    let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    fs::write(
        file.path(),
        r#"
[server]
port = 8088
environment = "development"

[security]
trusted_hosts = ["shop.example.com", "localhost:8088"]
"#,
    )
    .unwrap();

    env::set_var("TEXTILE_HOME_CONFIG", file.path());
    env::set_var("TEXTILE_HOME__DATABASE__MAX_CONNECTIONS", "4");
    let cfg = config::load().unwrap();
    assert_eq!(cfg.server.port, 8088);
    assert_eq!(cfg.server.environment, Environment::Development);
    assert_eq!(cfg.security.trusted_hosts, vec!["shop.example.com".to_string(), "localhost:8088".to_string()]);
    assert_eq!(cfg.database.max_connections, 4);
    // Untouched keys keep their defaults
    assert_eq!(cfg.security.max_body_bytes, 1024 * 1024);

    env::set_var("TEXTILE_HOME__SERVER__PORT", "0");
    let err = config::load().unwrap_err();
    assert!(err.to_string().contains("invalid server.port"));

    env::remove_var("TEXTILE_HOME__SERVER__PORT");
    env::remove_var("TEXTILE_HOME__DATABASE__MAX_CONNECTIONS");
    env::remove_var("TEXTILE_HOME_CONFIG");
}

#[test]
fn test_default_config() {
    let cfg = AppConfig::default();

    assert_eq!(cfg.server.host, "0.0.0.0");
    assert_eq!(cfg.server.port, 5000);
    assert_eq!(cfg.database.url, "sqlite://data/textile-home.db");
    assert_eq!(cfg.security.honeypot_paths.len(), 12);
    assert!(!cfg.security.honeypot_paths.iter().any(|p| p == "admin" || p == "login"));
    assert_eq!(cfg.admin.session_ttl().num_hours(), 24);
}

#[test]
fn test_bootstrap_admin_needs_password() {
    let mut cfg = AppConfig::default();
    cfg.admin.bootstrap_username = Some("admin".to_string());
    assert!(config::validate(&cfg).is_err());

    cfg.admin.bootstrap_password = Some("a-long-password".to_string());
    assert!(config::validate(&cfg).is_ok());
}

#[test]
fn test_ensure_sqlite_parent_dir() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("shop.db");
    let url = format!("sqlite://{}?mode=rwc", db_path.display());

    config::ensure_sqlite_parent_dir(&url).unwrap();
    assert!(dir.path().join("nested").is_dir());

    // Non-file URLs are left alone
    config::ensure_sqlite_parent_dir("sqlite::memory:").unwrap();
}
