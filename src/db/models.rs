/// Database models for accounts, payments, and intake submissions
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account record in the database
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub password_hash: String,
    /// Advisory flag set by the account linker once a succeeded consultation
    /// payment is on file
    pub consultation_paid: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// Session record in the database
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub account_id: String,
    pub access_token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Status of a payment row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PaymentStatus {
    Succeeded,
    Pending,
    Failed,
}

/// What a payment was for; only consultation payments unlock intake forms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PaymentPurpose {
    Consultation,
    Other,
}

/// Payment ledger record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    /// Checkout provider's reference for this payment, unique when present
    pub provider_ref: Option<String>,
    pub account_id: Option<String>,
    pub email: Option<String>,
    pub purpose: PaymentPurpose,
    pub status: PaymentStatus,
    pub amount_cents: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle status of an intake submission
///
/// `PendingPayment` and `Pending` are assigned by the submission recorder;
/// the later states are operator-driven via the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum SubmissionStatus {
    PendingPayment,
    Pending,
    Reviewed,
    InProgress,
    Completed,
    Archived,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::PendingPayment => "pending_payment",
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Reviewed => "reviewed",
            SubmissionStatus::InProgress => "in_progress",
            SubmissionStatus::Completed => "completed",
            SubmissionStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending_payment" => Some(SubmissionStatus::PendingPayment),
            "pending" => Some(SubmissionStatus::Pending),
            "reviewed" => Some(SubmissionStatus::Reviewed),
            "in_progress" => Some(SubmissionStatus::InProgress),
            "completed" => Some(SubmissionStatus::Completed),
            "archived" => Some(SubmissionStatus::Archived),
            _ => None,
        }
    }
}

/// Intake form submission record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub id: String,
    pub form_type: String,
    pub email: String,
    pub account_id: Option<String>,
    /// Opaque structured form payload, stored as JSON text
    pub form_data: String,
    pub status: SubmissionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_status_round_trip() {
        for status in [
            SubmissionStatus::PendingPayment,
            SubmissionStatus::Pending,
            SubmissionStatus::Reviewed,
            SubmissionStatus::InProgress,
            SubmissionStatus::Completed,
            SubmissionStatus::Archived,
        ] {
            assert_eq!(SubmissionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SubmissionStatus::parse("unknown"), None);
    }
}
