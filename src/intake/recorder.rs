/// Intake submission recording and promotion
use crate::{
    billing::PaymentLedger,
    db::models::{SubmissionRecord, SubmissionStatus},
    error::{PortalError, PortalResult},
    identity::{normalize_email, Identity},
    intake::SubmitOutcome,
};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Writes intake submissions with a status derived from payment history and
/// owns the idempotent pending_payment -> pending promotion.
pub struct SubmissionRecorder {
    db: SqlitePool,
    ledger: Arc<PaymentLedger>,
}

impl SubmissionRecorder {
    pub fn new(db: SqlitePool, ledger: Arc<PaymentLedger>) -> Self {
        Self { db, ledger }
    }

    /// Record an intake submission.
    ///
    /// The payment lookup here determines the stored status, not whether the
    /// submission is blocked; that is the access gate's separate check and
    /// the two may disagree (a first anonymous submission is allowed while
    /// being recorded pending_payment). A failed lookup degrades to
    /// pending_payment rather than dropping the submission; the webhook or
    /// reconciliation sweep promotes it once the payment is visible.
    pub async fn submit(
        &self,
        form_type: &str,
        email: &str,
        form_data: &serde_json::Value,
        authed_account: Option<&str>,
    ) -> PortalResult<SubmitOutcome> {
        let email = normalize_email(email);
        let identity = Identity::resolve(authed_account, Some(&email));

        let has_paid = match self.ledger.find_succeeded_consultation(&identity).await {
            Ok(found) => found.is_some(),
            Err(e) => {
                warn!("Payment lookup failed during submit, recording as unpaid: {}", e);
                false
            }
        };

        // Authenticated accounts always submit as pending; anonymous
        // submissions derive their status from the payment ledger.
        let status = if identity.is_authenticated() || has_paid {
            SubmissionStatus::Pending
        } else {
            SubmissionStatus::PendingPayment
        };

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let payload = serde_json::to_string(form_data)
            .map_err(|e| PortalError::Validation(format!("Unserializable form data: {}", e)))?;

        sqlx::query(
            "INSERT INTO submission (id, form_type, email, account_id, form_data, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&id)
        .bind(form_type)
        .bind(&email)
        .bind(authed_account)
        .bind(&payload)
        .bind(status)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(PortalError::Database)?;

        info!(
            "Recorded {} submission {} for {} ({})",
            form_type,
            id,
            email,
            status.as_str()
        );

        Ok(SubmitOutcome {
            record: SubmissionRecord {
                id,
                form_type: form_type.to_string(),
                email,
                account_id: authed_account.map(str::to_string),
                form_data: payload,
                status,
                created_at: now,
                updated_at: now,
            },
            needs_payment: !has_paid,
        })
    }

    /// Promote every pending_payment submission for an email to pending.
    ///
    /// Called optimistically by the payment-return handler and
    /// authoritatively by the webhook and the reconciliation sweep; only rows
    /// still in pending_payment are touched, so repeat calls converge to a
    /// no-op.
    pub async fn promote_pending(&self, email: &str) -> PortalResult<u64> {
        let email = normalize_email(email);

        let result = sqlx::query(
            "UPDATE submission SET status = ?1, updated_at = ?2
             WHERE email = ?3 AND status = ?4",
        )
        .bind(SubmissionStatus::Pending)
        .bind(Utc::now())
        .bind(&email)
        .bind(SubmissionStatus::PendingPayment)
        .execute(&self.db)
        .await
        .map_err(PortalError::Database)?;

        let promoted = result.rows_affected();
        if promoted > 0 {
            info!("Promoted {} submission(s) for {}", promoted, email);
        }

        Ok(promoted)
    }

    /// Attach an account to every email-keyed submission with no account yet
    pub async fn attach_account(&self, email: &str, account_id: &str) -> PortalResult<u64> {
        let result = sqlx::query(
            "UPDATE submission SET account_id = ?1, updated_at = ?2
             WHERE email = ?3 AND account_id IS NULL",
        )
        .bind(account_id)
        .bind(Utc::now())
        .bind(email)
        .execute(&self.db)
        .await
        .map_err(PortalError::Database)?;

        Ok(result.rows_affected())
    }

    /// Submissions belonging to an account (user dashboard)
    pub async fn list_for_account(&self, account_id: &str) -> PortalResult<Vec<SubmissionRecord>> {
        sqlx::query_as::<_, SubmissionRecord>(
            "SELECT * FROM submission WHERE account_id = ?1 ORDER BY created_at DESC",
        )
        .bind(account_id)
        .fetch_all(&self.db)
        .await
        .map_err(PortalError::Database)
    }

    /// Submissions by status, newest first (admin dashboard)
    pub async fn list_by_status(
        &self,
        status: Option<SubmissionStatus>,
        limit: i64,
    ) -> PortalResult<Vec<SubmissionRecord>> {
        match status {
            Some(status) => sqlx::query_as::<_, SubmissionRecord>(
                "SELECT * FROM submission WHERE status = ?1 ORDER BY created_at DESC LIMIT ?2",
            )
            .bind(status)
            .bind(limit)
            .fetch_all(&self.db)
            .await
            .map_err(PortalError::Database),
            None => sqlx::query_as::<_, SubmissionRecord>(
                "SELECT * FROM submission ORDER BY created_at DESC LIMIT ?1",
            )
            .bind(limit)
            .fetch_all(&self.db)
            .await
            .map_err(PortalError::Database),
        }
    }

    /// Fetch a submission by id
    pub async fn get(&self, id: &str) -> PortalResult<SubmissionRecord> {
        sqlx::query_as::<_, SubmissionRecord>("SELECT * FROM submission WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(PortalError::Database)?
            .ok_or_else(|| PortalError::NotFound(format!("Submission {}", id)))
    }

    /// Operator-driven status transition (admin dashboard)
    pub async fn update_status(
        &self,
        id: &str,
        status: SubmissionStatus,
    ) -> PortalResult<SubmissionRecord> {
        let result = sqlx::query(
            "UPDATE submission SET status = ?1, updated_at = ?2 WHERE id = ?3",
        )
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.db)
        .await
        .map_err(PortalError::Database)?;

        if result.rows_affected() == 0 {
            return Err(PortalError::NotFound(format!("Submission {}", id)));
        }

        self.get(id).await
    }
}
