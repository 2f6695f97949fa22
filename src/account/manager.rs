/// Account manager implementation using runtime queries
use crate::{
    account::ValidatedSession,
    config::ServerConfig,
    db::models::{Account, Session},
    error::{PortalError, PortalResult},
    identity::normalize_email,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;
use validator::ValidateEmail;

/// JWT claims carried by an access token
#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    /// Account id
    sub: String,
    /// Session id
    sid: String,
    exp: i64,
}

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
    config: Arc<ServerConfig>,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(db: SqlitePool, config: Arc<ServerConfig>) -> Self {
        Self { db, config }
    }

    /// Create a new account
    pub async fn create_account(
        &self,
        email: String,
        password: String,
        full_name: Option<String>,
    ) -> PortalResult<Account> {
        let email = normalize_email(&email);

        if !email.validate_email() {
            return Err(PortalError::Validation(format!(
                "Invalid email address: {}",
                email
            )));
        }

        if password.len() < 8 {
            return Err(PortalError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        if self.email_exists(&email).await? {
            return Err(PortalError::Conflict("Email already registered".to_string()));
        }

        let password_hash = Self::hash_password(&password)?;
        let is_admin = self
            .config
            .authentication
            .admin_emails
            .iter()
            .any(|a| a == &email);

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO account (id, email, full_name, password_hash, consultation_paid, is_admin, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&id)
        .bind(&email)
        .bind(&full_name)
        .bind(&password_hash)
        .bind(false)
        .bind(is_admin)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(PortalError::Database)?;

        Ok(Account {
            id,
            email,
            full_name,
            password_hash,
            consultation_paid: false,
            is_admin,
            created_at: now,
        })
    }

    /// Authenticate account and create session
    pub async fn login(&self, email: &str, password: &str) -> PortalResult<(Account, Session)> {
        let account = self.get_account_by_email(email).await?;

        let valid = Self::verify_password(password, &account.password_hash)?;
        if !valid {
            return Err(PortalError::Authentication("Invalid credentials".to_string()));
        }

        let session = self.create_session(&account.id).await?;

        Ok((account, session))
    }

    /// Create a session for an account
    pub async fn create_session(&self, account_id: &str) -> PortalResult<Session> {
        let session_id = Uuid::new_v4().to_string();

        let now = Utc::now();
        let expires_at = now + Duration::hours(self.config.authentication.session_ttl_hours);

        let access_token = self.generate_access_token(account_id, &session_id, expires_at)?;

        sqlx::query(
            "INSERT INTO session (id, account_id, access_token, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&session_id)
        .bind(account_id)
        .bind(&access_token)
        .bind(now)
        .bind(expires_at)
        .execute(&self.db)
        .await
        .map_err(PortalError::Database)?;

        Ok(Session {
            id: session_id,
            account_id: account_id.to_string(),
            access_token,
            created_at: now,
            expires_at,
        })
    }

    /// Validate access token and return session info
    pub async fn validate_access_token(&self, token: &str) -> PortalResult<ValidatedSession> {
        let claims = self.decode_access_token(token)?;

        // The token must also map to a live session row; logout and cleanup
        // delete rows, which revokes otherwise-valid tokens.
        let row = sqlx::query(
            "SELECT s.id, s.account_id, s.expires_at, a.is_admin
             FROM session s JOIN account a ON a.id = s.account_id
             WHERE s.access_token = ?1",
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await
        .map_err(PortalError::Database)?
        .ok_or_else(|| PortalError::Authentication("Unknown session".to_string()))?;

        let expires_at: DateTime<Utc> = row.get("expires_at");
        if expires_at < Utc::now() {
            return Err(PortalError::Authentication("Session expired".to_string()));
        }

        let account_id: String = row.get("account_id");
        if account_id != claims.sub {
            return Err(PortalError::Authentication("Token mismatch".to_string()));
        }

        Ok(ValidatedSession {
            account_id,
            session_id: row.get("id"),
            is_admin: row.get("is_admin"),
        })
    }

    /// Delete a session (logout)
    pub async fn delete_session(&self, session_id: &str) -> PortalResult<()> {
        sqlx::query("DELETE FROM session WHERE id = ?1")
            .bind(session_id)
            .execute(&self.db)
            .await
            .map_err(PortalError::Database)?;

        Ok(())
    }

    /// Get account by id
    pub async fn get_account(&self, account_id: &str) -> PortalResult<Account> {
        sqlx::query_as::<_, Account>("SELECT * FROM account WHERE id = ?1")
            .bind(account_id)
            .fetch_optional(&self.db)
            .await
            .map_err(PortalError::Database)?
            .ok_or_else(|| PortalError::NotFound(format!("Account {}", account_id)))
    }

    /// Get account by email
    pub async fn get_account_by_email(&self, email: &str) -> PortalResult<Account> {
        let email = normalize_email(email);
        sqlx::query_as::<_, Account>("SELECT * FROM account WHERE email = ?1")
            .bind(&email)
            .fetch_optional(&self.db)
            .await
            .map_err(PortalError::Database)?
            .ok_or_else(|| PortalError::Authentication("Invalid credentials".to_string()))
    }

    /// Mark an account as having a paid consultation (advisory metadata)
    pub async fn mark_consultation_paid(&self, account_id: &str) -> PortalResult<()> {
        sqlx::query("UPDATE account SET consultation_paid = 1 WHERE id = ?1")
            .bind(account_id)
            .execute(&self.db)
            .await
            .map_err(PortalError::Database)?;

        Ok(())
    }

    /// Delete sessions past their expiry; returns rows removed
    pub async fn cleanup_expired_sessions(&self) -> PortalResult<u64> {
        let result = sqlx::query("DELETE FROM session WHERE expires_at < ?1")
            .bind(Utc::now())
            .execute(&self.db)
            .await
            .map_err(PortalError::Database)?;

        Ok(result.rows_affected())
    }

    async fn email_exists(&self, email: &str) -> PortalResult<bool> {
        let row = sqlx::query("SELECT 1 FROM account WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .map_err(PortalError::Database)?;

        Ok(row.is_some())
    }

    fn generate_access_token(
        &self,
        account_id: &str,
        session_id: &str,
        expires_at: DateTime<Utc>,
    ) -> PortalResult<String> {
        let claims = AccessClaims {
            sub: account_id.to_string(),
            sid: session_id.to_string(),
            exp: expires_at.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.authentication.jwt_secret.as_bytes()),
        )
        .map_err(|e| PortalError::Internal(format!("Token generation failed: {}", e)))
    }

    fn decode_access_token(&self, token: &str) -> PortalResult<AccessClaims> {
        decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.config.authentication.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| PortalError::Authentication("Invalid token".to_string()))
    }

    fn hash_password(password: &str) -> PortalResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| PortalError::Internal(format!("Password hashing failed: {}", e)))
    }

    fn verify_password(password: &str, hash: &str) -> PortalResult<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| PortalError::Internal(format!("Corrupt password hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}
