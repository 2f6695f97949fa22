/// Payment ledger access
///
/// The ledger is the source of truth for whether a visitor has paid the
/// consultation fee. The access gate and submission recorder only ever ask
/// one question of it: does at least one succeeded consultation payment
/// exist for this identity?
use crate::{
    db::models::{PaymentPurpose, PaymentRecord, PaymentStatus},
    error::{PortalError, PortalResult},
    identity::Identity,
};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

pub struct PaymentLedger {
    db: SqlitePool,
}

impl PaymentLedger {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Find a succeeded consultation payment for the given identity.
    ///
    /// Existence is all that matters; the portal never counts payments.
    pub async fn find_succeeded_consultation(
        &self,
        identity: &Identity,
    ) -> PortalResult<Option<PaymentRecord>> {
        let query = match identity {
            Identity::Authenticated(account_id) => sqlx::query_as::<_, PaymentRecord>(
                "SELECT * FROM payment
                 WHERE account_id = ?1 AND purpose = ?2 AND status = ?3
                 LIMIT 1",
            )
            .bind(account_id),
            Identity::Anonymous(email) => sqlx::query_as::<_, PaymentRecord>(
                "SELECT * FROM payment
                 WHERE email = ?1 AND purpose = ?2 AND status = ?3
                 LIMIT 1",
            )
            .bind(email),
            Identity::Unknown => return Ok(None),
        };

        query
            .bind(PaymentPurpose::Consultation)
            .bind(PaymentStatus::Succeeded)
            .fetch_optional(&self.db)
            .await
            .map_err(PortalError::Database)
    }

    /// Record a succeeded consultation payment for an email.
    ///
    /// Idempotent on the provider reference: the optimistic payment-return
    /// handler and the authoritative webhook may both report the same
    /// checkout, and only one row may result.
    pub async fn record_succeeded(
        &self,
        email: &str,
        provider_ref: &str,
        amount_cents: i64,
        currency: &str,
    ) -> PortalResult<PaymentRecord> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO payment (id, provider_ref, account_id, email, purpose, status, amount_cents, currency, created_at)
             VALUES (?1, ?2, NULL, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(provider_ref) DO NOTHING",
        )
        .bind(&id)
        .bind(provider_ref)
        .bind(email)
        .bind(PaymentPurpose::Consultation)
        .bind(PaymentStatus::Succeeded)
        .bind(amount_cents)
        .bind(currency)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(PortalError::Database)?;

        self.get_by_provider_ref(provider_ref)
            .await?
            .ok_or_else(|| PortalError::Internal("Payment row missing after insert".to_string()))
    }

    /// Fetch a payment by the checkout provider's reference
    pub async fn get_by_provider_ref(
        &self,
        provider_ref: &str,
    ) -> PortalResult<Option<PaymentRecord>> {
        sqlx::query_as::<_, PaymentRecord>("SELECT * FROM payment WHERE provider_ref = ?1")
            .bind(provider_ref)
            .fetch_optional(&self.db)
            .await
            .map_err(PortalError::Database)
    }

    /// Attach an account to the exact payment named by a provider reference.
    ///
    /// Rows that already carry an account are left alone, which makes
    /// re-running the linker a no-op.
    pub async fn attach_account_by_provider_ref(
        &self,
        provider_ref: &str,
        account_id: &str,
    ) -> PortalResult<u64> {
        let result = sqlx::query(
            "UPDATE payment SET account_id = ?1
             WHERE provider_ref = ?2 AND account_id IS NULL",
        )
        .bind(account_id)
        .bind(provider_ref)
        .execute(&self.db)
        .await
        .map_err(PortalError::Database)?;

        Ok(result.rows_affected())
    }

    /// Attach an account to every email-keyed payment with no account yet
    pub async fn attach_account_by_email(
        &self,
        email: &str,
        account_id: &str,
    ) -> PortalResult<u64> {
        let result = sqlx::query(
            "UPDATE payment SET account_id = ?1
             WHERE email = ?2 AND account_id IS NULL",
        )
        .bind(account_id)
        .bind(email)
        .execute(&self.db)
        .await
        .map_err(PortalError::Database)?;

        Ok(result.rows_affected())
    }

    /// Emails that have a succeeded consultation payment on file but still
    /// hold submissions in pending_payment; the reconciliation sweep promotes
    /// these.
    pub async fn emails_awaiting_promotion(&self) -> PortalResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT s.email FROM submission s
             JOIN payment p ON p.email = s.email
             WHERE s.status = 'pending_payment'
               AND p.purpose = 'consultation' AND p.status = 'succeeded'",
        )
        .fetch_all(&self.db)
        .await
        .map_err(PortalError::Database)?;

        Ok(rows.into_iter().map(|(email,)| email).collect())
    }

    /// Recent payments, newest first (admin dashboard)
    pub async fn list_recent(&self, limit: i64) -> PortalResult<Vec<PaymentRecord>> {
        sqlx::query_as::<_, PaymentRecord>(
            "SELECT * FROM payment ORDER BY created_at DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await
        .map_err(PortalError::Database)
    }
}
