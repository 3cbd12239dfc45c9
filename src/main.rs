// src/main.rs
use axum::{extract::Extension, middleware, Router};
use dotenv::dotenv;
use reqwest::Client;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::PathBuf;
use std::time::Duration;
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

// ============================================================================
// MODULE IMPORTS
// ============================================================================

mod auth;
mod common;
mod health;
mod logging_middleware;
mod services;

// ============================================================================
// COMMON IMPORTS
// ============================================================================

use common::{AppConfig, AppState};
use services::monitoring::{init_sentry, init_tracing};
use services::{EphemeralStore, GoogleIdentityClient, MemoryStore, RedisStore};

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing();

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let config = AppConfig::from_env()?;
    let _sentry = init_sentry(&config);

    info!(
        admin_emails = config.admin_emails.len(),
        environment = %config.environment,
        "Configuration loaded"
    );

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    if let Some(path_part) = config.database_url.strip_prefix("sqlite://") {
        let path_without_params = path_part.split('?').next().unwrap_or("");
        if !path_without_params.is_empty() && !path_without_params.starts_with(':') {
            let db_path = PathBuf::from(path_without_params);
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }
    }

    let connect_options =
        SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await?;

    common::migrations::run_migrations(&pool, config.reset_db).await?;

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let store: Arc<dyn EphemeralStore> = match config.redis_url.as_deref() {
        Some(url) => Arc::new(RedisStore::connect(url).await?),
        None => {
            warn!("REDIS_URL not set - login state is kept in process memory and lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let http_client = Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .no_proxy()
        .build()?;

    let google = Arc::new(GoogleIdentityClient::new(http_client, config.oauth.clone()));
    info!("GoogleIdentityClient initialized");

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let shared = Arc::new(AppState::new(&config, pool.clone(), store.clone(), google));

    // ========================================================================
    // ROUTER COMPOSITION
    // ========================================================================

    let app = Router::new()
        .merge(auth::auth_routes())
        .merge(health::health_routes())
        // Add request/response body logging in debug mode
        .layer(middleware::from_fn(logging_middleware::log_request_response))
        .layer(Extension(shared))
        .layer({
            let origins: Vec<axum::http::HeaderValue> = config
                .cors_origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::AUTHORIZATION,
                ])
                .allow_credentials(true)
        })
        .layer(TraceLayer::new_for_http());

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // ========================================================================
    // SHUTDOWN
    // ========================================================================

    store.shutdown().await;
    pool.close().await;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
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
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
