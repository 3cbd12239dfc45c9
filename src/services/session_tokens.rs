// src/services/session_tokens.rs
//! First-party session tokens
//!
//! Tokens are self-contained HMAC-signed JWTs. Nothing is persisted: a token
//! is valid while its signature checks out under the configured secret and
//! algorithm and its `exp` has not passed.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::auth::models::User;
use crate::common::config::SessionTokenConfig;

#[derive(Debug, Error)]
#[error("failed to sign session token: {0}")]
pub struct SessionTokenError(String);

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user_id: i64,
    pub email: String,
    #[serde(default)]
    pub picture: String,
    #[serde(default)]
    pub admin: bool,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct SessionTokenIssuer {
    algorithm: Algorithm,
    lifetime: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SessionTokenIssuer {
    pub fn new(config: &SessionTokenConfig) -> Self {
        Self {
            algorithm: config.algorithm,
            lifetime: Duration::days(config.lifetime_days),
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
        }
    }

    pub fn mint(&self, user: &User) -> Result<String, SessionTokenError> {
        self.mint_at(user, Utc::now())
    }

    /// Signs a token as if issued at `now`
    pub fn mint_at(&self, user: &User, now: DateTime<Utc>) -> Result<String, SessionTokenError> {
        let claims = SessionClaims {
            user_id: user.id,
            email: user.email.clone(),
            picture: user.picture.clone().unwrap_or_default(),
            admin: user.admin,
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| SessionTokenError(e.to_string()))
    }

    /// Returns the claims of a valid token, `None` for anything else
    pub fn verify(&self, token: &str) -> Option<SessionClaims> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;

        match decode::<SessionClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                debug!(error = %e, "Session token rejected");
                None
            }
        }
    }
}
