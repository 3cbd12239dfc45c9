// src/services/google.rs
use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::common::config::OAuthConfig;
use crate::services::identity::{
    check_identity_claims, IdentityClaims, IdentityError, IdentityProvider, ProviderTokens,
};

/// Shortest gap between two key set refreshes triggered by unknown `kid`s
pub const JWKS_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Google OpenID Connect client
///
/// Redeems authorization codes and validates ID tokens against Google's
/// published key set. Keys are cached for the process lifetime; a token
/// naming an unknown `kid` triggers a refresh of the set (key rotation), at
/// most once per [`JWKS_MIN_REFRESH_INTERVAL`].
#[derive(Clone)]
pub struct GoogleIdentityClient {
    client: Client,
    config: OAuthConfig,
    jwks_cache: Arc<RwLock<HashMap<String, Jwk>>>,
    last_refresh: Arc<Mutex<Option<Instant>>>,
}

impl GoogleIdentityClient {
    pub fn new(client: Client, config: OAuthConfig) -> Self {
        Self {
            client,
            config,
            jwks_cache: Arc::new(RwLock::new(HashMap::new())),
            last_refresh: Arc::new(Mutex::new(None)),
        }
    }

    /// Resolves the signing key for `kid`, refreshing the key set on a miss
    pub async fn fetch_signing_key(&self, kid: &str) -> Result<Jwk, IdentityError> {
        if let Some(jwk) = self.jwks_cache.read().await.get(kid) {
            return Ok(jwk.clone());
        }

        {
            // Serializes refreshes; concurrent misses wait for the one in flight
            let mut last_refresh = self.last_refresh.lock().await;

            if let Some(jwk) = self.jwks_cache.read().await.get(kid) {
                return Ok(jwk.clone());
            }

            let throttled = (*last_refresh)
                .map_or(false, |at| at.elapsed() < JWKS_MIN_REFRESH_INTERVAL);

            if throttled {
                debug!(kid = %kid, "Signing key not cached, key set refreshed recently");
            } else {
                debug!(kid = %kid, "Signing key not cached, refreshing key set");
                self.refresh_jwks().await?;
                *last_refresh = Some(Instant::now());
            }
        }

        self.jwks_cache
            .read()
            .await
            .get(kid)
            .cloned()
            .ok_or_else(|| {
                warn!(kid = %kid, "ID token signed with unknown key");
                IdentityError::InvalidToken(format!("unknown signing key '{}'", kid))
            })
    }

    /// Replaces the cached key set with the provider's current one
    pub async fn refresh_jwks(&self) -> Result<usize, IdentityError> {
        let jwks = self.fetch_jwks().await?;
        let keys = index_keys(jwks);
        let count = keys.len();

        *self.jwks_cache.write().await = keys;
        info!(keys = count, jwks_url = %self.config.jwks_url, "Google signing keys refreshed");
        Ok(count)
    }

    async fn fetch_jwks(&self) -> Result<JwkSet, IdentityError> {
        let response = self
            .client
            .get(&self.config.jwks_url)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, jwks_url = %self.config.jwks_url, "Failed to fetch signing keys");
                IdentityError::Provider(format!("failed to fetch signing keys: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, "Signing key endpoint returned error status");
            return Err(IdentityError::Provider(format!(
                "signing key endpoint returned HTTP {}",
                status
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| IdentityError::Provider(format!("malformed key set: {}", e)))
    }

    #[cfg(test)]
    pub(crate) async fn preload_keys(&self, jwks: JwkSet) {
        *self.jwks_cache.write().await = index_keys(jwks);
    }
}

fn index_keys(jwks: JwkSet) -> HashMap<String, Jwk> {
    jwks.keys
        .into_iter()
        .filter_map(|jwk| jwk.common.key_id.clone().map(|kid| (kid, jwk)))
        .collect()
}

#[async_trait]
impl IdentityProvider for GoogleIdentityClient {
    async fn exchange_code(&self, code: &str) -> Result<ProviderTokens, IdentityError> {
        let params = [
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        debug!("Exchanging authorization code for tokens");

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, timeout = e.is_timeout(), "Token endpoint request failed");
                IdentityError::Provider(e.to_string())
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "Token exchange failed");
            return Err(IdentityError::Provider(format!("HTTP {}", status)));
        }

        response.json::<ProviderTokens>().await.map_err(|e| {
            error!(error = %e, "Token endpoint returned malformed body");
            IdentityError::Provider(format!("malformed token response: {}", e))
        })
    }

    async fn verify_id_token(
        &self,
        id_token: &str,
        expected_nonce: &str,
    ) -> Result<IdentityClaims, IdentityError> {
        let header = decode_header(id_token)
            .map_err(|e| IdentityError::InvalidToken(format!("bad header: {}", e)))?;
        let kid = header
            .kid
            .ok_or_else(|| IdentityError::InvalidToken("missing kid".to_string()))?;

        let jwk = self.fetch_signing_key(&kid).await?;
        let key = DecodingKey::from_jwk(&jwk)
            .map_err(|e| IdentityError::InvalidToken(format!("unusable signing key: {}", e)))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.config.client_id]);

        let claims = decode::<IdentityClaims>(id_token, &key, &validation)
            .map_err(|e| {
                let reason = match e.kind() {
                    ErrorKind::ExpiredSignature => "expired".to_string(),
                    ErrorKind::InvalidAudience => "audience mismatch".to_string(),
                    ErrorKind::InvalidSignature => "bad signature".to_string(),
                    ErrorKind::InvalidAlgorithm => "unexpected algorithm".to_string(),
                    _ => e.to_string(),
                };
                warn!(kid = %kid, reason = %reason, "ID token validation failed");
                IdentityError::InvalidToken(reason)
            })?
            .claims;

        check_identity_claims(&claims, expected_nonce)?;

        debug!(kid = %kid, "ID token verified");
        Ok(claims)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use axum::{extract::Form, http::StatusCode, routing::get, routing::post, Json, Router};
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn jwks() -> JwkSet {
        serde_json::from_value(jwks_json()).expect("valid jwks")
    }

    fn config(base: &str) -> OAuthConfig {
        OAuthConfig {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            redirect_uri: "http://localhost:8080/auth/token".to_string(),
            frontend_url: "http://localhost:5173/".to_string(),
            auth_url: format!("{}/auth", base),
            token_url: format!("{}/token", base),
            jwks_url: format!("{}/certs", base),
        }
    }

    async fn client_with_keys() -> GoogleIdentityClient {
        // Port 9 (discard) is never served; any fetch attempt fails fast
        let client = GoogleIdentityClient::new(http(), config("http://127.0.0.1:9"));
        client.preload_keys(jwks()).await;
        client
    }

    #[tokio::test]
    async fn test_valid_id_token_is_accepted() {
        let client = client_with_keys().await;
        let token = sign(&claims("nonce-1"), TEST_KID);

        let verified = client.verify_id_token(&token, "nonce-1").await.unwrap();
        assert_eq!(verified.email, "player@example.com");
        assert_eq!(verified.nonce.as_deref(), Some("nonce-1"));
    }

    #[tokio::test]
    async fn test_wrong_audience_is_rejected() {
        let client = client_with_keys().await;
        let mut other = claims("nonce-1");
        other.aud = "someone-else".to_string();

        let result = client.verify_id_token(&sign(&other, TEST_KID), "nonce-1").await;
        assert!(matches!(result, Err(IdentityError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_expired_id_token_is_rejected() {
        let client = client_with_keys().await;
        let mut expired = claims("nonce-1");
        expired.exp = Utc::now().timestamp() - 3600;

        let result = client.verify_id_token(&sign(&expired, TEST_KID), "nonce-1").await;
        assert!(matches!(result, Err(IdentityError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_nonce_mismatch_is_reported() {
        let client = client_with_keys().await;
        let token = sign(&claims("attacker-nonce"), TEST_KID);

        let result = client.verify_id_token(&token, "nonce-1").await;
        assert!(matches!(result, Err(IdentityError::NonceMismatch)));
    }

    #[tokio::test]
    async fn test_untrusted_issuer_is_reported() {
        let client = client_with_keys().await;
        let mut foreign = claims("nonce-1");
        foreign.iss = "https://login.example.com".to_string();

        let result = client.verify_id_token(&sign(&foreign, TEST_KID), "nonce-1").await;
        assert!(matches!(result, Err(IdentityError::InvalidIssuer(_))));
    }

    #[tokio::test]
    async fn test_tampered_token_is_rejected() {
        let client = client_with_keys().await;
        let token = sign(&claims("nonce-1"), TEST_KID);
        let forged_payload = sign(&claims("nonce-2"), TEST_KID);
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = forged_payload.split('.').nth(1).unwrap();

        let result = client.verify_id_token(&parts.join("."), "nonce-2").await;
        assert!(matches!(result, Err(IdentityError::InvalidToken(_))));
    }

    /// Key set endpoint that counts how often it is hit
    async fn counting_certs_server() -> (String, Arc<AtomicUsize>) {
        let fetches = Arc::new(AtomicUsize::new(0));
        let counter = fetches.clone();
        let router = Router::new().route(
            "/certs",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(jwks_json())
                }
            }),
        );
        (spawn_provider(router).await, fetches)
    }

    #[tokio::test]
    async fn test_signing_keys_fetched_once_and_cached() {
        let (base, fetches) = counting_certs_server().await;
        let client = GoogleIdentityClient::new(http(), config(&base));
        let token = sign(&claims("nonce-1"), TEST_KID);

        client.verify_id_token(&token, "nonce-1").await.unwrap();
        client.verify_id_token(&token, "nonce-1").await.unwrap();

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_kid_refresh_is_throttled() {
        let (base, fetches) = counting_certs_server().await;
        let client = GoogleIdentityClient::new(http(), config(&base));

        for kid in ["bogus-1", "bogus-2", "bogus-3"] {
            let result = client.fetch_signing_key(kid).await;
            assert!(matches!(result, Err(IdentityError::InvalidToken(_))));
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);

        // Known keys keep resolving from the cache meanwhile
        assert!(client.fetch_signing_key(TEST_KID).await.is_ok());

        tokio::time::pause();
        tokio::time::advance(JWKS_MIN_REFRESH_INTERVAL + Duration::from_secs(1)).await;
        tokio::time::resume();

        let result = client.fetch_signing_key("bogus-4").await;
        assert!(matches!(result, Err(IdentityError::InvalidToken(_))));
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_is_not_throttled() {
        let client = GoogleIdentityClient::new(http(), config("http://127.0.0.1:9"));

        for _ in 0..2 {
            let result = client.fetch_signing_key(TEST_KID).await;
            assert!(matches!(result, Err(IdentityError::Provider(_))));
        }
    }

    #[tokio::test]
    async fn test_unknown_kid_after_refresh_is_rejected() {
        let router = Router::new().route("/certs", get(|| async { Json(jwks_json()) }));
        let base = spawn_provider(router).await;
        let client = GoogleIdentityClient::new(http(), config(&base));

        let result = client.fetch_signing_key("rotated-away").await;
        assert!(matches!(result, Err(IdentityError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_unreachable_key_endpoint_is_provider_error() {
        let client = GoogleIdentityClient::new(http(), config("http://127.0.0.1:9"));
        let token = sign(&claims("nonce-1"), TEST_KID);

        let result = client.verify_id_token(&token, "nonce-1").await;
        assert!(matches!(result, Err(IdentityError::Provider(_))));
    }

    #[tokio::test]
    async fn test_exchange_code_posts_authorization_code_grant() {
        let router = Router::new().route(
            "/token",
            post(|Form(form): Form<HashMap<String, String>>| async move {
                let ok = form.get("grant_type").map(String::as_str) == Some("authorization_code")
                    && form.get("code").map(String::as_str) == Some("abc")
                    && form.get("client_id").map(String::as_str) == Some("client-id")
                    && form.get("client_secret").map(String::as_str) == Some("client-secret")
                    && form.get("redirect_uri").map(String::as_str)
                        == Some("http://localhost:8080/auth/token");
                if !ok {
                    return Err(StatusCode::BAD_REQUEST);
                }
                Ok(Json(serde_json::json!({
                    "id_token": "header.payload.signature",
                    "access_token": "ya29.access",
                    "expires_in": 3599,
                    "token_type": "Bearer"
                })))
            }),
        );
        let base = spawn_provider(router).await;
        let client = GoogleIdentityClient::new(http(), config(&base));

        let tokens = client.exchange_code("abc").await.unwrap();
        assert_eq!(tokens.id_token, "header.payload.signature");
        assert_eq!(tokens.access_token, "ya29.access");
        assert!(tokens.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_exchange_code_error_status_is_provider_error() {
        let router = Router::new().route(
            "/token",
            post(|| async { (StatusCode::BAD_REQUEST, r#"{"error":"invalid_grant"}"#) }),
        );
        let base = spawn_provider(router).await;
        let client = GoogleIdentityClient::new(http(), config(&base));

        let result = client.exchange_code("expired-code").await;
        assert!(matches!(result, Err(IdentityError::Provider(_))));
    }

    #[tokio::test]
    async fn test_exchange_code_malformed_body_is_provider_error() {
        let router = Router::new().route(
            "/token",
            post(|| async { Json(serde_json::json!({ "access_token": "only" })) }),
        );
        let base = spawn_provider(router).await;
        let client = GoogleIdentityClient::new(http(), config(&base));

        let result = client.exchange_code("abc").await;
        assert!(matches!(result, Err(IdentityError::Provider(_))));
    }
}
