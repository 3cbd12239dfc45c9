//! Authentication handlers

use axum::extract::{rejection::JsonRejection, Extension, Json, Query};
use axum::http::{header::LOCATION, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::AuthError;
use super::extractors::AuthedUser;
use super::models::{CallbackParams, ExchangeRequest, TokenResponse, UserProfile};
use super::validators::{CallbackValidator, ExchangeValidator};
use crate::common::{safe_email_log, ApiError, AppState, Validator};

/// 302 Found; axum's `Redirect` helpers only emit 303/307/308
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}

/// GET /auth/login
/// Starts the Google OAuth flow and redirects to the consent screen
pub async fn login_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let uri = state.login.initiate_login().await?;

    info!("Redirecting to Google OAuth consent screen");
    Ok(found(&uri))
}

/// GET /auth/token?code=&state=
/// Google redirects here after consent. On success the frontend receives a
/// one-time exchange code, never the session token itself.
pub async fn token_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Response, ApiError> {
    // Any rejected callback still burns its state; the flow must restart
    let presented_state = params
        .state
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    // Check for error from Google
    if let Some(error) = params.error.as_deref() {
        warn!(oauth_error = %error, "Google OAuth returned error");
        if let Some(login_state) = presented_state {
            state.login.abandon_login(login_state).await?;
        }
        return Err(AuthError::Provider(format!("authorization failed: {}", error)).into());
    }

    if let Err(invalid) = CallbackValidator.validate(&params).into_result() {
        if let Some(login_state) = presented_state {
            state.login.abandon_login(login_state).await?;
        }
        return Err(invalid.into());
    }

    let (code, login_state) = match (params.code.as_deref(), params.state.as_deref()) {
        (Some(code), Some(login_state)) => (code.trim(), login_state.trim()),
        _ => return Err(ApiError::ValidationError("code and state are required".to_string())),
    };

    debug!("Received OAuth callback with authorization code");

    let redirect = state.login.complete_login(code, login_state).await?;
    Ok(found(&redirect))
}

/// POST /auth/exchange
/// Exchanges a one-time code for the session token
///
/// # Request Body
/// ```json
/// { "code": "<exchange code>" }
/// ```
///
/// # Response
/// ```json
/// { "token": "<session token>" }
/// ```
pub async fn exchange_handler(
    Extension(state): Extension<Arc<AppState>>,
    body: Result<Json<ExchangeRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    ExchangeValidator.validate(&body).into_result()?;

    let token = state.login.redeem_exchange_code(body.code.trim()).await?;
    Ok(Json(TokenResponse { token }))
}

/// GET /auth/me
/// Returns the profile of the user the bearer token belongs to
pub async fn me_handler(
    Extension(state): Extension<Arc<AppState>>,
    authed: AuthedUser,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state
        .users
        .get(authed.user_id)
        .await
        .map_err(AuthError::from)?
        .ok_or_else(|| {
            warn!(
                user_id = authed.user_id,
                email = %safe_email_log(&authed.email),
                "Token subject no longer exists"
            );
            AuthError::UserNotFound
        })?;

    debug!(user_id = user.id, is_admin = authed.is_admin, "Profile requested");
    Ok(Json(UserProfile::from(user)))
}
