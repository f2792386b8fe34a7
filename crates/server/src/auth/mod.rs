//! Authentication Module
//!
//! Handles user signup and login against a SQLite users table.
//! Passwords are stored as bcrypt hashes.

use crate::error::{Error, Result};
use crate::models::UserInfo;
use bcrypt::{hash, verify};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

/// User record stored in database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            created_at: user.created_at,
        }
    }
}

/// Auth manager handles all authentication
pub struct AuthManager {
    pool: SqlitePool,
    cost: u32,
}

impl AuthManager {
    /// Open (or create) the users database at `db_path`
    pub async fn new(db_path: &Path, cost: u32) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        let manager = Self { pool, cost };
        manager.init_db().await?;
        info!("[Auth] Initialized at {:?}", db_path);
        Ok(manager)
    }

    async fn init_db(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub fn hash_password(&self, password: &str) -> Result<String> {
        hash(password, self.cost).map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))
    }

    /// Check a password against a stored hash. Malformed hashes never match.
    pub fn verify_password(&self, password: &str, password_hash: &str) -> bool {
        verify(password, password_hash).unwrap_or_else(|e| {
            warn!("[Auth] Unreadable password hash: {}", e);
            false
        })
    }

    pub async fn find_user_by_name(&self, username: &str) -> Result<Option<User>> {
        let row: Option<(String, String, String, String)> = sqlx::query_as(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, username, password_hash, created_at)| User {
            id,
            username,
            password_hash,
            created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
        }))
    }

    /// Register a new user. Usernames are unique.
    pub async fn signup(&self, username: &str, password: &str) -> Result<User> {
        if username.is_empty() || password.is_empty() {
            return Err(Error::validation("Username and password are required"));
        }

        if self.find_user_by_name(username).await?.is_some() {
            return Err(Error::validation("Username exists!"));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            password_hash: self.hash_password(password)?,
            created_at: Utc::now(),
        };

        let inserted = sqlx::query(
            "INSERT INTO users (id, username, password_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.created_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => {}
            // Lost a race with a concurrent signup for the same name
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(Error::validation("Username exists!"));
            }
            Err(e) => return Err(e.into()),
        }

        info!("[Auth] User registered: {}", username);
        Ok(user)
    }

    /// Check credentials
    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        let user = self
            .find_user_by_name(username)
            .await?
            .ok_or(Error::InvalidCredentials)?;

        if !self.verify_password(password, &user.password_hash) {
            warn!("[Auth] Failed login attempt for {}", username);
            return Err(Error::InvalidCredentials);
        }

        info!("[Auth] User logged in: {}", user.username);
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // Lowest cost bcrypt accepts; keeps the tests fast
    const TEST_COST: u32 = 4;

    async fn manager(dir: &TempDir) -> AuthManager {
        AuthManager::new(&dir.path().join("users.sqlite"), TEST_COST)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_signup_then_login() {
        let dir = TempDir::new().unwrap();
        let auth = manager(&dir).await;

        let user = auth.signup("alice", "secret").await.unwrap();
        assert_ne!(user.password_hash, "secret");

        let logged_in = auth.login("alice", "secret").await.unwrap();
        assert_eq!(logged_in.id, user.id);
    }

    #[tokio::test]
    async fn test_duplicate_username_is_rejected() {
        let dir = TempDir::new().unwrap();
        let auth = manager(&dir).await;

        auth.signup("alice", "secret").await.unwrap();
        let err = auth.signup("alice", "other").await.unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m == "Username exists!"));
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let dir = TempDir::new().unwrap();
        let auth = manager(&dir).await;
        auth.signup("alice", "secret").await.unwrap();

        assert!(matches!(
            auth.login("alice", "wrong").await,
            Err(Error::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody", "secret").await,
            Err(Error::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_find_user_by_name() {
        let dir = TempDir::new().unwrap();
        let auth = manager(&dir).await;
        assert!(auth.find_user_by_name("alice").await.unwrap().is_none());

        auth.signup("alice", "secret").await.unwrap();
        let found = auth.find_user_by_name("alice").await.unwrap().unwrap();
        assert_eq!(found.username, "alice");
        assert!(auth.verify_password("secret", &found.password_hash));
        assert!(!auth.verify_password("secret", "not-a-hash"));
    }
}
