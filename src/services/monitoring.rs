// Monitoring: tracing subscriber and optional Sentry error reporting
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::common::AppConfig;

/// Installs the global subscriber: fmt output filtered by `RUST_LOG`
/// (default `info`), plus a Sentry layer that is inert until a client is bound.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_target(false))
        .with(sentry_tracing::layer())
        .init();
}

/// Starts the Sentry client when `SENTRY_DSN` is configured.
///
/// The returned guard flushes pending events on drop, so it must live for the
/// whole process.
pub fn init_sentry(config: &AppConfig) -> Option<sentry::ClientInitGuard> {
    let raw = config.sentry_dsn.as_deref()?;

    let dsn = match raw.parse::<sentry::types::Dsn>() {
        Ok(dsn) => dsn,
        Err(e) => {
            warn!(error = %e, "Invalid SENTRY_DSN, error reporting disabled");
            return None;
        }
    };

    let guard = sentry::init(sentry::ClientOptions {
        dsn: Some(dsn),
        release: sentry::release_name!(),
        environment: Some(config.environment.clone().into()),
        traces_sample_rate: 0.0,
        ..Default::default()
    });

    info!(environment = %config.environment, "Sentry initialized successfully");
    Some(guard)
}
