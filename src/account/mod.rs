/// Account management system
///
/// Handles client account creation, authentication, and sessions. Account
/// creation is the moment previously anonymous intake history is linked to
/// the new account (see `crate::intake::linker`).

mod manager;

pub use manager::AccountManager;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Account creation request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 256))]
    pub password: String,
    #[validate(length(max = 200))]
    pub full_name: Option<String>,
}

/// Account creation response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountResponse {
    pub account_id: String,
    pub email: String,
    pub access_token: String,
    /// Outcome of re-keying prior anonymous payments/submissions
    pub linking: crate::intake::LinkReport,
}

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub email: String,
    pub password: String,
}

/// Session response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub account_id: String,
    pub email: String,
    pub access_token: String,
    pub consultation_paid: bool,
}

/// Session info (for the user dashboard)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub account_id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub consultation_paid: bool,
    pub is_admin: bool,
}

/// Validated session from bearer token
#[derive(Debug, Clone)]
pub struct ValidatedSession {
    pub account_id: String,
    pub session_id: String,
    pub is_admin: bool,
}
