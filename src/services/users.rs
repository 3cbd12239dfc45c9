// src/services/users.rs
//! User directory backed by the `users` table

use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::auth::models::User;
use crate::common::safe_email_log;

#[derive(Debug, Clone)]
pub struct UserDirectory {
    pool: SqlitePool,
    admin_emails: Arc<HashSet<String>>,
}

impl UserDirectory {
    pub fn new(pool: SqlitePool, admin_emails: HashSet<String>) -> Self {
        Self {
            pool,
            admin_emails: Arc::new(admin_emails),
        }
    }

    fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails.contains(&email.to_lowercase())
    }

    /// Upserts the user for `email` and stamps `last_login`.
    ///
    /// The picture is only recorded on creation. Listed admin emails are
    /// promoted on every login and never demoted.
    pub async fn find_or_create_by_email(
        &self,
        email: &str,
        picture: Option<&str>,
    ) -> Result<User, sqlx::Error> {
        let is_admin = self.is_admin_email(email);

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, picture, admin, last_login)
            VALUES (?, ?, ?, datetime('now'))
            ON CONFLICT(email) DO UPDATE SET
                last_login = datetime('now'),
                updated_at = datetime('now'),
                admin = users.admin OR excluded.admin
            RETURNING id, email, picture, admin, created_at, updated_at, last_login
            "#,
        )
        .bind(email)
        .bind(picture)
        .bind(is_admin)
        .fetch_one(&self.pool)
        .await?;

        info!(
            user_id = user.id,
            email = %safe_email_log(&user.email),
            admin = user.admin,
            "User resolved for login"
        );

        Ok(user)
    }

    pub async fn get(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        debug!(user_id = id, "Looking up user");
        sqlx::query_as::<_, User>(
            "SELECT id, email, picture, admin, created_at, updated_at, last_login FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::migrations::run_migrations;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn directory(admins: &[&str]) -> UserDirectory {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        run_migrations(&pool, false).await.unwrap();

        UserDirectory::new(pool, admins.iter().map(|e| e.to_string()).collect())
    }

    #[tokio::test]
    async fn test_first_login_creates_user() {
        let users = directory(&[]).await;

        let user = users
            .find_or_create_by_email("player@example.com", Some("https://example.com/p.png"))
            .await
            .unwrap();

        assert_eq!(user.email, "player@example.com");
        assert_eq!(user.picture.as_deref(), Some("https://example.com/p.png"));
        assert!(!user.admin);
        assert!(user.last_login.is_some());
    }

    #[tokio::test]
    async fn test_repeat_login_is_idempotent() {
        let users = directory(&[]).await;

        let first = users
            .find_or_create_by_email("player@example.com", Some("https://example.com/a.png"))
            .await
            .unwrap();
        let second = users
            .find_or_create_by_email("player@example.com", Some("https://example.com/b.png"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.picture.as_deref(), Some("https://example.com/a.png"));

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&users.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_repeat_login_updates_last_login() {
        let users = directory(&[]).await;

        let user = users
            .find_or_create_by_email("player@example.com", None)
            .await
            .unwrap();
        sqlx::query("UPDATE users SET last_login = '2000-01-01 00:00:00' WHERE id = ?")
            .bind(user.id)
            .execute(&users.pool)
            .await
            .unwrap();

        let again = users
            .find_or_create_by_email("player@example.com", None)
            .await
            .unwrap();
        assert_ne!(again.last_login.as_deref(), Some("2000-01-01 00:00:00"));
    }

    #[tokio::test]
    async fn test_admin_email_is_flagged() {
        let users = directory(&["boss@example.com"]).await;

        let boss = users
            .find_or_create_by_email("Boss@Example.com", None)
            .await
            .unwrap();
        let player = users
            .find_or_create_by_email("player@example.com", None)
            .await
            .unwrap();

        assert!(boss.admin);
        assert!(!player.admin);
    }

    #[tokio::test]
    async fn test_existing_user_promoted_when_listed() {
        let plain = directory(&[]).await;
        let user = plain
            .find_or_create_by_email("later-admin@example.com", None)
            .await
            .unwrap();
        assert!(!user.admin);

        let promoted = UserDirectory::new(
            plain.pool.clone(),
            HashSet::from(["later-admin@example.com".to_string()]),
        )
        .find_or_create_by_email("later-admin@example.com", None)
        .await
        .unwrap();
        assert!(promoted.admin);

        let not_demoted = plain
            .find_or_create_by_email("later-admin@example.com", None)
            .await
            .unwrap();
        assert!(not_demoted.admin);
    }

    #[tokio::test]
    async fn test_get_missing_user_is_none() {
        let users = directory(&[]).await;
        assert!(users.get(999).await.unwrap().is_none());

        let user = users
            .find_or_create_by_email("player@example.com", None)
            .await
            .unwrap();
        assert_eq!(users.get(user.id).await.unwrap(), Some(user));
    }
}
