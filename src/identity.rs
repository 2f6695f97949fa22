/// Identity resolution for prospective clients
///
/// A visitor is known either by an account id (once registered) or by the
/// bare email on their intake form (before registration). The payment and
/// submission history for both must be treated as one once linked.
use serde::{Deserialize, Serialize};

/// The key under which a visitor's payment and submission history is tracked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Identity {
    /// Registered account, identified by account id
    Authenticated(String),
    /// Unregistered visitor, identified by a normalized email
    Anonymous(String),
    /// First-ever interaction; no email known yet
    Unknown,
}

impl Identity {
    /// Resolve the current identity: an authenticated account wins over a
    /// supplied email, and no email at all means a first-ever interaction.
    pub fn resolve(account_id: Option<&str>, email: Option<&str>) -> Self {
        if let Some(id) = account_id {
            return Identity::Authenticated(id.to_string());
        }
        match email.map(normalize_email) {
            Some(e) if !e.is_empty() => Identity::Anonymous(e),
            _ => Identity::Unknown,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Authenticated(_))
    }
}

/// Normalize an email for use as an identity key
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
