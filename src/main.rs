use std::net::SocketAddr;

use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Sqlite};
use tokio::time::{self, Duration as TokioDuration};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use textile_home::{build_router, config, db, seed, state::AppState, store::AdminRepository};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging: stdout plus a daily-rotated file under ./logs
    std::fs::create_dir_all("logs").ok();
    let (stdout_nb, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let file_appender = tracing_appender::rolling::daily("logs", "textile-home.log");
    let (file_nb, file_guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(stdout_nb))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file_nb))
        .init();
    // Writers flush on drop
    let _log_guards = (stdout_guard, file_guard);

    // Embedded defaults -> textile-home.toml -> env/.env
    let app_cfg = config::load()?;

    let db_url = &app_cfg.database.url;
    config::ensure_sqlite_parent_dir(db_url)?;
    if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
        info!("Creating SQLite database at {}", db_url);
        Sqlite::create_database(db_url).await?;
    }
    let pool = SqlitePoolOptions::new()
        .max_connections(app_cfg.database.max_connections)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys=ON;").execute(&mut *conn).await?;
                let _ = sqlx::query("PRAGMA busy_timeout=10000;").execute(&mut *conn).await;
                let _ = sqlx::query("PRAGMA temp_store=MEMORY;").execute(&mut *conn).await;
                Ok(())
            })
        })
        .connect(db_url)
        .await?;

    db::init_db(&pool).await?;

    if app_cfg.catalog.seed_on_start {
        seed::seed_catalog(&pool).await?;
    }
    seed::ensure_bootstrap_admin(&pool, &app_cfg.admin).await?;

    let state = AppState::new(pool.clone(), app_cfg.clone());
    info!(environment = ?app_cfg.server.environment, "Security pipeline configured");

    // Expire stale suspicious-activity entries and temporary bans
    {
        let monitor = state.monitor.clone();
        tokio::spawn(async move {
            let mut ticker = time::interval(TokioDuration::from_secs(3600));
            loop {
                ticker.tick().await;
                let removed = monitor.sweep().await;
                if removed > 0 {
                    info!(target: "security", removed, "Swept suspicious-activity entries");
                }
            }
        });
    }

    // Drop limiter timestamps outside their windows
    {
        let limiters = state.limiters.clone();
        tokio::spawn(async move {
            let mut ticker = time::interval(TokioDuration::from_secs(300));
            loop {
                ticker.tick().await;
                limiters.cleanup_all().await;
            }
        });
    }

    // Purge expired admin sessions
    {
        let pool = pool.clone();
        tokio::spawn(async move {
            let mut ticker = time::interval(TokioDuration::from_secs(900));
            loop {
                ticker.tick().await;
                match AdminRepository::new(&pool).purge_expired_sessions().await {
                    Ok(0) => {}
                    Ok(n) => info!("Purged {} expired admin sessions", n),
                    Err(e) => tracing::warn!("Admin session purge failed: {}", e),
                }
            }
        });
    }

    let app = build_router(state);

    let host = app_cfg.server.host.clone();
    let port = app_cfg.server.port;
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid listen addr {}:{} - {}", host, port, e))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Textile Home listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("Shutdown signal received. Stopping server...");
}
