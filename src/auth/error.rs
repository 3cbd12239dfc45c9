//! Login flow failures

use axum::http::StatusCode;
use thiserror::Error;

use crate::services::ephemeral_store::StoreError;
use crate::services::identity::IdentityError;
use crate::services::session_tokens::SessionTokenError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid state")]
    InvalidState,

    #[error("Nonce mismatch - potential replay attack")]
    NonceMismatch,

    #[error("Invalid issuer")]
    InvalidIssuer,

    #[error("Identity provider error: {0}")]
    Provider(String),

    #[error("Invalid or expired code")]
    InvalidOrExpiredCode,

    #[error("{0}")]
    Unauthenticated(String),

    #[error("User not found")]
    UserNotFound,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    TokenIssue(#[from] SessionTokenError),
}

impl From<IdentityError> for AuthError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::NonceMismatch => AuthError::NonceMismatch,
            IdentityError::InvalidIssuer(_) => AuthError::InvalidIssuer,
            IdentityError::Provider(msg) | IdentityError::InvalidToken(msg) => {
                AuthError::Provider(msg)
            }
        }
    }
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidState
            | AuthError::NonceMismatch
            | AuthError::InvalidIssuer
            | AuthError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AuthError::Provider(_) | AuthError::InvalidOrExpiredCode => StatusCode::BAD_REQUEST,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::Store(_) | AuthError::Database(_) | AuthError::TokenIssue(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidState => "INVALID_STATE",
            AuthError::NonceMismatch => "NONCE_MISMATCH",
            AuthError::InvalidIssuer => "INVALID_ISSUER",
            AuthError::Provider(_) => "PROVIDER_ERROR",
            AuthError::InvalidOrExpiredCode => "INVALID_OR_EXPIRED_CODE",
            AuthError::Unauthenticated(_) => "UNAUTHORIZED",
            AuthError::UserNotFound => "NOT_FOUND",
            AuthError::Store(_) | AuthError::TokenIssue(_) => "INTERNAL_SERVER_ERROR",
            AuthError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Infrastructure failures whose detail stays in the logs
    pub fn is_internal(&self) -> bool {
        self.status() == StatusCode::INTERNAL_SERVER_ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_errors_map_to_taxonomy() {
        assert!(matches!(
            AuthError::from(IdentityError::NonceMismatch),
            AuthError::NonceMismatch
        ));
        assert!(matches!(
            AuthError::from(IdentityError::InvalidIssuer("x".into())),
            AuthError::InvalidIssuer
        ));
        assert!(matches!(
            AuthError::from(IdentityError::InvalidToken("expired".into())),
            AuthError::Provider(_)
        ));
        assert!(matches!(
            AuthError::from(IdentityError::Provider("HTTP 500".into())),
            AuthError::Provider(_)
        ));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::InvalidState.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::NonceMismatch.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::InvalidIssuer.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::Provider("boom".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::InvalidOrExpiredCode.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AuthError::UserNotFound.status(), StatusCode::NOT_FOUND);
        assert!(AuthError::Store(StoreError::Unavailable("down".into())).is_internal());
    }
}
