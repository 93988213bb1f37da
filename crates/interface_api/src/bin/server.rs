//! Expense Workflow - API Server Binary
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin expense-api
//!
//! # Run with environment variables
//! API_PORT=8080 API_DATABASE_URL=postgres://... cargo run --bin expense-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_JWT_SECRET` - JWT signing secret (required in production)
//! * `API_JWT_EXPIRATION_SECS` - JWT token expiration in seconds (default: 3600)
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)
//! * `API_EXCHANGE_RATE_BASE_URL` - Rate service endpoint
//! * `API_EXCHANGE_RATE_TIMEOUT_SECS` - Rate service timeout (default: 5)
//! * `API_RATE_CACHE_TTL_SECS` - Rate and country cache lifetime (default: 3600)
//! * `API_COUNTRIES_URL` - Country catalog endpoint

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use core_kernel::CircuitBreakerConfig;
use domain_expense::adapters::{
    CountryCatalog, CountryCatalogConfig, ExchangeRateConfig, HttpRateConverter, LogNotificationSink,
};
use domain_expense::WorkflowPorts;
use infra_db::{
    create_pool, run_migrations, DatabaseConfig, PostgresClaimAdapter, PostgresDirectoryAdapter,
    PostgresRuleAdapter,
};
use interface_api::{config::ApiConfig, create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("invalid API_* configuration")?;

    init_tracing(&config.log_level);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        "Starting expense workflow API server"
    );

    let pool = create_pool(DatabaseConfig::new(&config.database_url)).await?;
    run_migrations(&pool).await?;

    let claims = Arc::new(PostgresClaimAdapter::new(pool.clone()));
    let rules = Arc::new(PostgresRuleAdapter::new(pool.clone()));
    let directory = Arc::new(PostgresDirectoryAdapter::new(pool));

    let converter = Arc::new(HttpRateConverter::new(ExchangeRateConfig {
        base_url: config.exchange_rate_base_url.clone(),
        timeout_secs: config.exchange_rate_timeout_secs,
        cache_ttl_secs: config.rate_cache_ttl_secs,
        circuit_breaker: Some(CircuitBreakerConfig::default()),
    })?);

    let countries = CountryCatalog::new(CountryCatalogConfig {
        url: config.countries_url.clone(),
        timeout_secs: config.exchange_rate_timeout_secs,
        cache_ttl_secs: config.rate_cache_ttl_secs,
    })?;

    let ports = WorkflowPorts {
        claims: claims.clone(),
        rules,
        directory,
        converter: converter.clone(),
        notifier: Arc::new(LogNotificationSink::new()),
    };

    let state = AppState::new(ports, countries, config.clone())
        .with_health_check(claims)
        .with_health_check(converter);
    let app = create_router(state);

    let addr: SocketAddr = config.server_addr().parse()?;
    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber; `RUST_LOG` wins over the configured level
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Waits for Ctrl+C or SIGTERM so in-flight requests can finish
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
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
