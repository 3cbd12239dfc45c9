// Application state shared across all modules

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::auth::login::LoginService;
use crate::common::config::AppConfig;
use crate::services::ephemeral_store::EphemeralStore;
use crate::services::identity::IdentityProvider;
use crate::services::session_tokens::SessionTokenIssuer;
use crate::services::users::UserDirectory;

/// Process-wide handles, built once at startup and shared through `Extension`
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub store: Arc<dyn EphemeralStore>,
    pub users: UserDirectory,
    pub tokens: SessionTokenIssuer,
    pub login: LoginService,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        db: SqlitePool,
        store: Arc<dyn EphemeralStore>,
        provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        let users = UserDirectory::new(db.clone(), config.admin_emails.clone());
        let tokens = SessionTokenIssuer::new(&config.session);
        let login = LoginService::new(
            config.oauth.clone(),
            store.clone(),
            provider,
            users.clone(),
            tokens.clone(),
        );

        Self {
            db,
            store,
            users,
            tokens,
            login,
        }
    }
}
