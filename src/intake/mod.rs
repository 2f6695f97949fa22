/// Consultation intake workflow
///
/// The portal's design core: deciding whether an intake form may be
/// submitted (payment gating), recording submissions with the right status,
/// bridging the external checkout round trip through a persisted per-client
/// cache, and re-keying anonymous history once an account is created.

mod gate;
mod linker;
mod recorder;
mod session_cache;

pub use gate::AccessGate;
pub use linker::AccountLinker;
pub use recorder::SubmissionRecorder;
pub use session_cache::{keys as session_keys, SessionCache};

use crate::db::models::SubmissionRecord;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Intake form submission request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitIntakeRequest {
    /// Which intake form this is (e.g. "estate_planning", "family_law")
    #[validate(length(min = 1, max = 100))]
    pub form_type: String,
    #[validate(email)]
    pub email: String,
    /// Opaque structured form payload
    pub form_data: serde_json::Value,
}

/// Result of recording an intake submission
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub record: SubmissionRecord,
    /// True when no consultation payment is on file; the caller routes the
    /// visitor to checkout
    pub needs_payment: bool,
}

/// Where a denied visitor should be routed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateRedirect {
    Signup,
}

/// Access gate decision for an intake submission attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<GateRedirect>,
}

impl GateDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            redirect: None,
        }
    }

    /// Paid but unregistered: the visitor must create an account before any
    /// further submissions.
    pub fn require_signup() -> Self {
        Self {
            allowed: false,
            reason: Some("create account".to_string()),
            redirect: Some(GateRedirect::Signup),
        }
    }
}

/// Outcome of re-keying anonymous records to a new account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub payments_linked: u64,
    pub submissions_linked: u64,
}

impl LinkReport {
    pub fn completed(payments_linked: u64, submissions_linked: u64) -> Self {
        Self {
            success: true,
            error: None,
            payments_linked,
            submissions_linked,
        }
    }

    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            payments_linked: 0,
            submissions_linked: 0,
        }
    }
}
