//! Reimbursement API Server Binary
//!
//! # Usage
//!
//! ```bash
//! # In-memory store, handy for local development
//! API_STORE_BACKEND=memory cargo run --bin reimbursement-api
//!
//! # PostgreSQL
//! API_DATABASE_URL=postgres://... cargo run --bin reimbursement-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_JWT_SECRET` - JWT signing secret shared with the identity provider
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_STORE_BACKEND` - `postgres` (default) or `memory`
//! * `API_LOG_LEVEL` - trace, debug, info, warn, error (default: info)
//! * `API_LOG_FORMAT` - `pretty` (default) or `json`
//! * `API_CURRENCY` - ISO code claims are filed in (default: IDR)
//! * `API_TIMEZONE` - IANA zone for report dates (default: Asia/Jakarta)
//! * `API_BUDGET_POLICY` - `enforce` (default) or `warn`
//! * `API_BOOTSTRAP_ADMIN_EMAIL` / `API_BOOTSTRAP_ADMIN_NAME` - first admin of an empty directory

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use core_kernel::store::mock::{InMemoryFileStore, InMemoryRecordStore};
use core_kernel::RecordStore;
use domain_directory::{NewUser, Role};
use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresRecordStore};
use interface_api::config::{ApiConfig, LogFormat, StoreBackend};
use interface_api::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("invalid API_* configuration")?;

    init_tracing(&config.log_level, config.log_format);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        backend = ?config.store_backend,
        currency = %config.currency,
        timezone = config.timezone.name(),
        budget_policy = %config.budget_policy,
        "Starting reimbursement API server"
    );

    let store = open_store(&config).await?;
    let files = Arc::new(InMemoryFileStore::default());
    let state = AppState::new(store, files, config.clone());

    bootstrap_admin(&state, &config).await?;

    let app = create_router(state);

    let addr: SocketAddr = config.server_addr().parse().context("invalid host/port")?;
    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber; `RUST_LOG` wins over the configured level
fn init_tracing(log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init(),
    }
}

async fn open_store(config: &ApiConfig) -> anyhow::Result<Arc<dyn RecordStore>> {
    match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory record store; data is lost on restart");
            Ok(Arc::new(InMemoryRecordStore::new()))
        }
        StoreBackend::Postgres => {
            tracing::info!("Connecting to database...");
            let pool = create_pool(DatabaseConfig::new(config.database_url.clone()))
                .await
                .context("database connection failed")?;
            run_migrations(&pool).await.context("migrations failed")?;
            tracing::info!("Database ready");
            Ok(Arc::new(PostgresRecordStore::new(pool)))
        }
    }
}

/// Creates the configured admin when the directory has no users yet
async fn bootstrap_admin(state: &AppState, config: &ApiConfig) -> anyhow::Result<()> {
    let Some(email) = config.bootstrap_admin_email.clone() else {
        return Ok(());
    };
    let input = NewUser {
        email,
        display_name: config
            .bootstrap_admin_name
            .clone()
            .unwrap_or_else(|| "Administrator".to_string()),
        role: Role::Admin,
        department: None,
    };
    match state.directory.bootstrap_admin(input).await? {
        Some(admin) => tracing::info!(user_id = %admin.value.id, "Bootstrap admin created"),
        None => tracing::debug!("Directory already has users; bootstrap skipped"),
    }
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
