// src/common/config.rs
//! Application configuration loaded from the environment
//!
//! Required values abort startup; everything else falls back to a default.

use jsonwebtoken::Algorithm;
use std::collections::HashSet;
use std::env;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const DEFAULT_GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_GOOGLE_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// OAuth client registration and provider endpoints
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub frontend_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub jwks_url: String,
}

/// Session token signing configuration
#[derive(Debug, Clone)]
pub struct SessionTokenConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub lifetime_days: i64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub oauth: OAuthConfig,
    pub session: SessionTokenConfig,
    pub database_url: String,
    /// Drop and recreate tables at startup (local development only)
    pub reset_db: bool,
    pub redis_url: Option<String>,
    pub http_timeout_secs: u64,
    pub admin_emails: HashSet<String>,
    pub cors_origins: Vec<String>,
    pub port: u16,
    pub sentry_dsn: Option<String>,
    pub environment: String,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let oauth = OAuthConfig {
            client_id: required("GOOGLE_CLIENT_ID")?,
            client_secret: required("GOOGLE_CLIENT_SECRET")?,
            redirect_uri: required("OAUTH_REDIRECT_URI")?,
            frontend_url: required("FRONTEND_URL")?,
            auth_url: get("GOOGLE_AUTH_URL").unwrap_or_else(|| DEFAULT_GOOGLE_AUTH_URL.to_string()),
            token_url: get("GOOGLE_TOKEN_URL")
                .unwrap_or_else(|| DEFAULT_GOOGLE_TOKEN_URL.to_string()),
            jwks_url: get("GOOGLE_JWKS_URL").unwrap_or_else(|| DEFAULT_GOOGLE_JWKS_URL.to_string()),
        };

        let algorithm = match get("JWT_ALGORITHM") {
            Some(raw) => parse_hmac_algorithm(&raw)?,
            None => Algorithm::HS256,
        };

        let lifetime_days = match get("JWT_EXPIRES_IN_DAYS") {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(days) if days > 0 => days,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "JWT_EXPIRES_IN_DAYS",
                        reason: format!("expected a positive number of days, got '{}'", raw),
                    })
                }
            },
            None => 7,
        };

        let session = SessionTokenConfig {
            secret: required("JWT_SECRET")?,
            algorithm,
            lifetime_days,
        };

        let http_timeout_secs = match get("HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                name: "HTTP_TIMEOUT_SECS",
                reason: e.to_string(),
            })?,
            None => 10,
        };

        let port = match get("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: e.to_string(),
            })?,
            None => 8080,
        };

        // Parse admin emails from comma-separated env var
        let admin_emails = get("ADMIN_EMAILS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let cors_origins = get("CORS_ORIGINS")
            .unwrap_or_else(|| {
                "http://localhost:5173,https://blueflyingpanda.github.io".to_string()
            })
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            oauth,
            session,
            database_url: get("DATABASE_URL").unwrap_or_else(|| "sqlite://wordgame.db".to_string()),
            reset_db: get("RESET_DB")
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            redis_url: get("REDIS_URL"),
            http_timeout_secs,
            admin_emails,
            cors_origins,
            port,
            sentry_dsn: get("SENTRY_DSN"),
            environment: get("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
        })
    }
}

/// Session tokens are signed with a shared secret, so only HMAC algorithms apply
fn parse_hmac_algorithm(raw: &str) -> Result<Algorithm, ConfigError> {
    let algorithm = Algorithm::from_str(raw.trim()).map_err(|e| ConfigError::Invalid {
        name: "JWT_ALGORITHM",
        reason: e.to_string(),
    })?;

    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
        other => Err(ConfigError::Invalid {
            name: "JWT_ALGORITHM",
            reason: format!("{:?} needs a key pair; use HS256, HS384 or HS512", other),
        }),
    }
}
