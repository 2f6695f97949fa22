/// Persisted per-client session flags
///
/// The hosted checkout performs a full redirect away from the portal's front
/// end, so any in-flight state must survive both a page reload and a server
/// restart. These flags live in the portal database, keyed by an opaque
/// client reference the front end carries in the `x-intake-session` header.
///
/// This is a cache/hint layer only; the payment ledger stays the source of
/// truth. Written by exactly one path (the payment-return handler) and
/// cleared by exactly one path (a successful account link).
use crate::error::{PortalError, PortalResult};
use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use sqlx::{Row, SqlitePool};
use tracing::debug;

/// Fixed, namespaced state keys
pub mod keys {
    pub const PENDING_ACCOUNT_CREATION: &str = "intake:pending_account_creation";
    pub const PAID_EMAIL: &str = "intake:paid_email";
    pub const PAYMENT_REF: &str = "intake:payment_ref";
}

pub struct SessionCache {
    db: SqlitePool,
}

impl SessionCache {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Generate a fresh opaque client reference
    pub fn generate_client_ref() -> String {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();

        format!("intake-{}", token.to_lowercase())
    }

    /// Record that a visitor has paid but not yet registered.
    ///
    /// Called once, by the payment-return handler.
    pub async fn set_pending_account_creation(
        &self,
        client_ref: &str,
        email: &str,
        payment_ref: &str,
    ) -> PortalResult<()> {
        self.set(client_ref, keys::PENDING_ACCOUNT_CREATION, "true")
            .await?;
        self.set(client_ref, keys::PAID_EMAIL, email).await?;
        self.set(client_ref, keys::PAYMENT_REF, payment_ref).await?;

        Ok(())
    }

    /// Email flagged as paid-but-unregistered, if any
    pub async fn pending_email(&self, client_ref: &str) -> PortalResult<Option<String>> {
        self.get(client_ref, keys::PAID_EMAIL).await
    }

    /// Checkout reference from the last completed payment, if any
    pub async fn payment_ref(&self, client_ref: &str) -> PortalResult<Option<String>> {
        self.get(client_ref, keys::PAYMENT_REF).await
    }

    /// Whether the pending-account flag is set
    pub async fn is_pending_account_creation(&self, client_ref: &str) -> PortalResult<bool> {
        Ok(self
            .get(client_ref, keys::PENDING_ACCOUNT_CREATION)
            .await?
            .as_deref()
            == Some("true"))
    }

    /// Remove all flags for a client.
    ///
    /// Called once, after the account linker completes.
    pub async fn clear_all(&self, client_ref: &str) -> PortalResult<()> {
        debug!("Session cache CLEAR: {}", client_ref);

        sqlx::query(
            "DELETE FROM client_session_state
             WHERE client_ref = ?1 AND key IN (?2, ?3, ?4)",
        )
        .bind(client_ref)
        .bind(keys::PENDING_ACCOUNT_CREATION)
        .bind(keys::PAID_EMAIL)
        .bind(keys::PAYMENT_REF)
        .execute(&self.db)
        .await
        .map_err(PortalError::Database)?;

        Ok(())
    }

    async fn set(&self, client_ref: &str, key: &str, value: &str) -> PortalResult<()> {
        debug!("Session cache SET: {} {}", client_ref, key);

        sqlx::query(
            "INSERT INTO client_session_state (client_ref, key, value, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(client_ref, key) DO UPDATE SET value = ?3, updated_at = ?4",
        )
        .bind(client_ref)
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.db)
        .await
        .map_err(PortalError::Database)?;

        Ok(())
    }

    async fn get(&self, client_ref: &str, key: &str) -> PortalResult<Option<String>> {
        let row = sqlx::query(
            "SELECT value FROM client_session_state WHERE client_ref = ?1 AND key = ?2",
        )
        .bind(client_ref)
        .bind(key)
        .fetch_optional(&self.db)
        .await
        .map_err(PortalError::Database)?;

        Ok(row.map(|r| r.get("value")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_namespaced() {
        assert!(keys::PENDING_ACCOUNT_CREATION.starts_with("intake:"));
        assert!(keys::PAID_EMAIL.starts_with("intake:"));
        assert!(keys::PAYMENT_REF.starts_with("intake:"));
    }

    #[test]
    fn test_client_refs_are_unique() {
        use std::collections::HashSet;

        let refs: HashSet<String> = (0..100)
            .map(|_| SessionCache::generate_client_ref())
            .collect();
        assert_eq!(refs.len(), 100);
        assert!(refs.iter().all(|r| r.starts_with("intake-")));
    }
}
