//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `GET /auth/login` - Redirect to Google consent screen
/// - `GET /auth/token` - Google callback, redirects to the frontend with an exchange code
/// - `POST /auth/exchange` - Trade an exchange code for a session token
/// - `GET /auth/me` - Current user profile
pub fn auth_routes() -> Router {
    Router::new()
        .route("/auth/login", get(handlers::login_handler))
        .route("/auth/token", get(handlers::token_handler))
        .route("/auth/exchange", post(handlers::exchange_handler))
        .route("/auth/me", get(handlers::me_handler))
}
