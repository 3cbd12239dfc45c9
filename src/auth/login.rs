//! Google login handshake
//!
//! One flow moves through `initiate_login` → provider consent →
//! `complete_login` → `redeem_exchange_code`. Each step consumes the
//! one-time value produced by the previous one, so a flow can only move
//! forward and a failed callback can never be replayed.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::error::AuthError;
use crate::common::config::OAuthConfig;
use crate::common::{safe_email_log, safe_token_log};
use crate::services::ephemeral_store::EphemeralStore;
use crate::services::identity::IdentityProvider;
use crate::services::session_tokens::SessionTokenIssuer;
use crate::services::users::UserDirectory;

pub const LOGIN_ATTEMPT_TTL: Duration = Duration::from_secs(5 * 60);
pub const EXCHANGE_CODE_TTL: Duration = Duration::from_secs(60);

/// 512 bits of entropy per state, nonce and exchange code
const OPAQUE_TOKEN_BYTES: usize = 64;
const OAUTH_SCOPES: [&str; 3] = ["openid", "profile", "email"];

pub fn state_key(state: &str) -> String {
    format!("oauth:state:{}", state)
}

pub fn exchange_key(code: &str) -> String {
    format!("auth:exchange:{}", code)
}

/// URL-safe random token from the thread-local CSPRNG
pub fn generate_opaque_token() -> String {
    let mut bytes = [0u8; OPAQUE_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[derive(Clone)]
pub struct LoginService {
    oauth: OAuthConfig,
    store: Arc<dyn EphemeralStore>,
    provider: Arc<dyn IdentityProvider>,
    users: UserDirectory,
    tokens: SessionTokenIssuer,
}

impl LoginService {
    pub fn new(
        oauth: OAuthConfig,
        store: Arc<dyn EphemeralStore>,
        provider: Arc<dyn IdentityProvider>,
        users: UserDirectory,
        tokens: SessionTokenIssuer,
    ) -> Self {
        Self {
            oauth,
            store,
            provider,
            users,
            tokens,
        }
    }

    /// Records a new login attempt and returns the provider consent URL
    pub async fn initiate_login(&self) -> Result<String, AuthError> {
        let state = generate_opaque_token();
        let nonce = generate_opaque_token();

        self.store
            .set_ex(&state_key(&state), &nonce, LOGIN_ATTEMPT_TTL)
            .await?;

        debug!(state = %safe_token_log(&state), "Login attempt initiated");
        Ok(self.authorization_url(&state, &nonce))
    }

    /// Handles the provider callback and returns the frontend redirect
    pub async fn complete_login(&self, code: &str, state: &str) -> Result<String, AuthError> {
        // Taking the state deletes it before any network I/O
        let nonce = match self.store.take(&state_key(state)).await? {
            Some(nonce) => nonce,
            None => {
                warn!(state = %safe_token_log(state), "No login attempt for state");
                return Err(AuthError::InvalidState);
            }
        };

        let provider_tokens = self.provider.exchange_code(code).await?;

        let claims = self
            .provider
            .verify_id_token(&provider_tokens.id_token, &nonce)
            .await
            .map_err(|e| {
                warn!(error = %e, "Could not verify id_token");
                AuthError::from(e)
            })?;

        let user = self
            .users
            .find_or_create_by_email(&claims.email, claims.picture.as_deref())
            .await?;

        let session_token = self.tokens.mint(&user)?;

        let exchange_code = generate_opaque_token();
        self.store
            .set_ex(&exchange_key(&exchange_code), &session_token, EXCHANGE_CODE_TTL)
            .await?;

        info!(
            user_id = user.id,
            email = %safe_email_log(&user.email),
            "Login completed, exchange code issued"
        );

        Ok(self.frontend_redirect(&exchange_code))
    }

    /// Consumes the login attempt when the provider reports an error instead of a code
    pub async fn abandon_login(&self, state: &str) -> Result<(), AuthError> {
        if self.store.take(&state_key(state)).await?.is_some() {
            debug!(state = %safe_token_log(state), "Login attempt abandoned");
        }
        Ok(())
    }

    /// Trades a one-time exchange code for the session token it guards
    pub async fn redeem_exchange_code(&self, code: &str) -> Result<String, AuthError> {
        match self.store.take(&exchange_key(code)).await? {
            Some(token) => {
                debug!(code = %safe_token_log(code), "Exchange code redeemed");
                Ok(token)
            }
            None => {
                warn!(code = %safe_token_log(code), "No session token for exchange code");
                Err(AuthError::InvalidOrExpiredCode)
            }
        }
    }

    fn authorization_url(&self, state: &str, nonce: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&nonce={}",
            self.oauth.auth_url,
            urlencoding::encode(&self.oauth.client_id),
            urlencoding::encode(&self.oauth.redirect_uri),
            urlencoding::encode(&OAUTH_SCOPES.join(" ")),
            urlencoding::encode(state),
            urlencoding::encode(nonce),
        )
    }

    fn frontend_redirect(&self, exchange_code: &str) -> String {
        let separator = if self.oauth.frontend_url.contains('?') {
            '&'
        } else {
            '?'
        };
        format!(
            "{}{}code={}",
            self.oauth.frontend_url,
            separator,
            urlencoding::encode(exchange_code)
        )
    }
}
