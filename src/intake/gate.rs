/// Access gate for intake form submissions
use crate::{
    billing::PaymentLedger,
    identity::Identity,
    intake::{GateDecision, SessionCache},
};
use std::sync::Arc;
use tracing::warn;

/// Decides whether an intake submission attempt may proceed.
///
/// Authentication supersedes payment gating: once an account exists, access
/// control beyond this point is business logic elsewhere. An unauthenticated
/// identity with a succeeded consultation payment on file is denied and
/// redirected to signup before any further submission, even the first one
/// after paying. That conservative rule forces account creation rather than
/// unlimited anonymous submissions; candidate for product review, preserved
/// as is.
pub struct AccessGate {
    ledger: Arc<PaymentLedger>,
    cache: Arc<SessionCache>,
}

impl AccessGate {
    pub fn new(ledger: Arc<PaymentLedger>, cache: Arc<SessionCache>) -> Self {
        Self { ledger, cache }
    }

    /// Gate an intake submission attempt.
    ///
    /// Never fails: a ledger outage must not block a legitimate visitor, so
    /// lookup errors resolve to allowed (fail open) and are only logged.
    pub async fn can_submit(&self, identity: &Identity, client_ref: Option<&str>) -> GateDecision {
        let email = match identity {
            Identity::Authenticated(_) => return GateDecision::allow(),
            Identity::Unknown => return GateDecision::allow(),
            Identity::Anonymous(email) => email,
        };

        // Fast path: the checkout round trip already flagged this email as
        // paid, no ledger round-trip needed.
        if let Some(client_ref) = client_ref {
            match self.cache.pending_email(client_ref).await {
                Ok(Some(cached)) if cached == *email => {
                    return GateDecision::require_signup();
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Session cache read failed, consulting ledger: {}", e);
                }
            }
        }

        match self.ledger.find_succeeded_consultation(identity).await {
            Ok(Some(_)) => GateDecision::require_signup(),
            Ok(None) => GateDecision::allow(),
            Err(e) => {
                warn!("Payment ledger lookup failed, failing open: {}", e);
                GateDecision::allow()
            }
        }
    }
}
