//! Authentication data models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User database model
#[derive(FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub picture: Option<String>,
    pub admin: bool,
    pub created_at: String,
    pub updated_at: String,
    pub last_login: Option<String>,
}

/// Query string Google appends when redirecting back to `/auth/token`
#[derive(Deserialize, Debug, Default)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Body of `POST /auth/exchange`
#[derive(Deserialize, Debug)]
pub struct ExchangeRequest {
    pub code: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TokenResponse {
    pub token: String,
}

/// Profile returned by `GET /auth/me`
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub picture: String,
    pub admin: bool,
    pub created_at: String,
    pub last_login: Option<String>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            picture: user.picture.unwrap_or_default(),
            admin: user.admin,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}
