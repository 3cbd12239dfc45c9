//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;
use tracing::{debug, warn};

use super::error::AuthError;
use crate::common::{safe_email_log, ApiError, AppState};

/// Authenticated user extractor
///
/// Validates the bearer session token. The user record itself is not
/// loaded here; handlers that need it look it up by `user_id`.
#[derive(Debug)]
pub struct AuthedUser {
    pub user_id: i64,
    pub email: String,
    pub is_admin: bool,
}

/// Splits `Authorization: Bearer <token>`; the scheme is case-insensitive
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();

    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(app_state): Extension<Arc<AppState>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let header = match parts.headers.get(AUTHORIZATION) {
            Some(value) => value.to_str().map_err(|_| {
                AuthError::Unauthenticated("Invalid authorization header format".into())
            })?,
            None => {
                warn!("Authentication failed: missing Authorization header");
                return Err(AuthError::Unauthenticated("Missing authorization header".into()).into());
            }
        };

        let token = bearer_token(header).ok_or_else(|| {
            warn!("Authentication failed: malformed Authorization header");
            AuthError::Unauthenticated("Invalid authorization header format".into())
        })?;

        let claims = app_state.tokens.verify(token).ok_or_else(|| {
            warn!("Authentication failed: invalid or expired session token");
            AuthError::Unauthenticated("Invalid or expired token".into())
        })?;

        debug!(
            user_id = claims.user_id,
            email = %safe_email_log(&claims.email),
            is_admin = claims.admin,
            "User authentication successful via extractor"
        );

        Ok(AuthedUser {
            user_id: claims.user_id,
            email: claims.email,
            is_admin: claims.admin,
        })
    }
}
