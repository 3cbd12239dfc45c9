// src/services/identity.rs
//! Identity provider seam used by the login flow

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Issuer strings Google uses in ID tokens
pub const GOOGLE_ISSUERS: [&str; 2] = ["https://accounts.google.com", "accounts.google.com"];

#[derive(Debug, Error)]
pub enum IdentityError {
    /// Transport failure, non-success status or unparseable provider response
    #[error("identity provider request failed: {0}")]
    Provider(String),

    /// Signature, audience, expiry or key lookup failure
    #[error("invalid id_token: {0}")]
    InvalidToken(String),

    #[error("nonce mismatch - potential replay attack")]
    NonceMismatch,

    #[error("invalid issuer: {0}")]
    InvalidIssuer(String),
}

/// Token endpoint response for the authorization-code grant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderTokens {
    pub id_token: String,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Verified identity token payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub email: String,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Redeems an authorization code at the provider's token endpoint.
    async fn exchange_code(&self, code: &str) -> Result<ProviderTokens, IdentityError>;

    /// Validates an ID token and checks its nonce and issuer.
    async fn verify_id_token(
        &self,
        id_token: &str,
        expected_nonce: &str,
    ) -> Result<IdentityClaims, IdentityError>;
}

/// Nonce and issuer checks applied after signature validation
pub fn check_identity_claims(
    claims: &IdentityClaims,
    expected_nonce: &str,
) -> Result<(), IdentityError> {
    if claims.nonce.as_deref() != Some(expected_nonce) {
        return Err(IdentityError::NonceMismatch);
    }

    if !GOOGLE_ISSUERS.contains(&claims.iss.as_str()) {
        return Err(IdentityError::InvalidIssuer(claims.iss.clone()));
    }

    Ok(())
}
