// Main entry point for the session auth service

use anyhow::Context;
use secrecy::ExposeSecret;
use session_auth::api::views::HtmlRenderer;
use session_auth::api::{create_router, AppState, CredentialStore, SessionStore};
use session_auth::auth::audit_logger::AuditLogger;
use session_auth::auth::credential_store::{DbCredentialStore, MemoryCredentialStore};
use session_auth::auth::password::PasswordHasher;
use session_auth::auth::service::AuthService;
use session_auth::config::Config;
use session_auth::core::crypto::CookieSigner;
use session_auth::state::session_store::{MemorySessionStore, RedisSessionStore};

use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load and validate configuration first (before any logging)
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // 2. Initialize tracing subscriber with config values
    init_tracing(&config)?;

    info!("Starting session auth service");
    info!(
        bind_address = %config.bind_address,
        port = config.port,
        environment = %config.environment,
        "Configuration loaded"
    );

    // 3. Initialize database pool (if configured)
    let db_pool: Option<Arc<sqlx::PgPool>> = match config.database_url {
        Some(ref database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(database_url)
                .await
                .map_err(|e| {
                    error!(error = %e, "Failed to connect to database");
                    e
                })
                .context("connecting to DATABASE_URL")?;
            info!("Database pool initialized");
            Some(Arc::new(pool))
        }
        None => None,
    };

    // 4. Initialize credential store (DB or in-memory)
    let credential_store: Arc<dyn CredentialStore + Send + Sync> = match db_pool {
        Some(ref pool) => {
            let store = DbCredentialStore::new((**pool).clone(), config.user_cache_ttl_secs);
            store.ensure_schema().await.context("creating users table")?;
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL not set, user records are kept in memory and lost on restart");
            Arc::new(MemoryCredentialStore::new())
        }
    };

    info!("Credential store initialized");

    // 5. Initialize session store (Redis or in-memory)
    let session_store: Arc<dyn SessionStore + Send + Sync> = match config.redis_url {
        Some(ref redis_url) => Arc::new(
            RedisSessionStore::new(redis_url, config.session_ttl_secs)
                .await
                .map_err(|e| {
                    error!(error = %e, "Failed to initialize Redis session store");
                    e
                })?,
        ),
        None => {
            warn!("REDIS_URL not set, sessions are kept in memory and lost on restart");
            Arc::new(MemorySessionStore::new(config.session_ttl_secs))
        }
    };

    info!("Session store initialized");

    // 6. Initialize audit logger
    let audit_logger = Arc::new(AuditLogger::new(db_pool.clone()));
    audit_logger
        .ensure_schema()
        .await
        .context("creating auth_audit_log table")?;

    // 7. Password hashing and cookie signing
    let hasher = PasswordHasher::new(config.bcrypt_cost)?;
    let cookie_signer = Arc::new(CookieSigner::new(config.session_secret.expose_secret())?);

    info!(bcrypt_cost = hasher.cost(), "Password hasher initialized");

    // 8. Create AppState
    let app_state = AppState {
        auth_service: Arc::new(AuthService::new(credential_store.clone(), hasher)),
        credential_store,
        session_store,
        renderer: Arc::new(HtmlRenderer),
        cookie_signer,
        audit_logger,
        config: Arc::new(config.clone()),
    };

    // 9. Create router
    let router = create_router(&app_state).with_state(app_state);

    // 10. Start HTTP server
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {}", addr))?;

    info!(addr = %addr, "Server listening on {}", addr);

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber based on configuration
fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let level = parse_log_level(&config.log_level)?;

    // RUST_LOG wins over LOG_LEVEL
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_env_filter(filter);

    if config.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}

/// Parse log level string to tracing Level
fn parse_log_level(level: &str) -> anyhow::Result<tracing::Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(tracing::Level::TRACE),
        "debug" => Ok(tracing::Level::DEBUG),
        "info" => Ok(tracing::Level::INFO),
        "warn" => Ok(tracing::Level::WARN),
        "error" => Ok(tracing::Level::ERROR),
        _ => anyhow::bail!("Invalid log level: {}", level),
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            info!("SIGTERM received, starting graceful shutdown");
        },
    }
}
