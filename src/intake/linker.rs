/// Anonymous-to-authenticated record linking
use crate::{
    account::AccountManager,
    billing::PaymentLedger,
    identity::{normalize_email, Identity},
    intake::{LinkReport, SessionCache, SubmissionRecorder},
};
use std::sync::Arc;
use tracing::{info, warn};

/// Re-keys email-associated payment and submission records to a newly
/// created account.
///
/// The steps run in order and the whole operation is best-effort: the
/// backing store offers no cross-table transaction, so completed steps are
/// not rolled back on a later failure. Steps 1 and 2 only touch rows with no
/// account attached yet, which makes a re-run after partial completion
/// converge instead of double-linking.
pub struct AccountLinker {
    ledger: Arc<PaymentLedger>,
    recorder: Arc<SubmissionRecorder>,
    accounts: Arc<AccountManager>,
    cache: Arc<SessionCache>,
}

impl AccountLinker {
    pub fn new(
        ledger: Arc<PaymentLedger>,
        recorder: Arc<SubmissionRecorder>,
        accounts: Arc<AccountManager>,
        cache: Arc<SessionCache>,
    ) -> Self {
        Self {
            ledger,
            recorder,
            accounts,
            cache,
        }
    }

    /// Link all records for `email` to `account_id`.
    ///
    /// Payment and submission attachment failures abort and surface; the
    /// advisory profile flag and the cache clear never fail the operation.
    pub async fn link(
        &self,
        account_id: &str,
        email: &str,
        client_ref: Option<&str>,
    ) -> LinkReport {
        let email = normalize_email(email);

        // Step 1: payments. Prefer the exact checkout reference cached by the
        // payment-return handler; fall back to every unattached row for the
        // email.
        let cached_ref = match client_ref {
            Some(client_ref) => match self.cache.payment_ref(client_ref).await {
                Ok(cached) => cached,
                Err(e) => {
                    warn!("Session cache read failed during linking: {}", e);
                    None
                }
            },
            None => None,
        };

        let payments_linked = match &cached_ref {
            Some(payment_ref) => {
                self.ledger
                    .attach_account_by_provider_ref(payment_ref, account_id)
                    .await
            }
            None => self.ledger.attach_account_by_email(&email, account_id).await,
        };
        let payments_linked = match payments_linked {
            Ok(n) => n,
            Err(e) => {
                warn!("Payment linking failed for {}: {}", email, e);
                return LinkReport::failed(e);
            }
        };

        // Step 2: submissions.
        let submissions_linked = match self.recorder.attach_account(&email, account_id).await {
            Ok(n) => n,
            Err(e) => {
                warn!("Submission linking failed for {}: {}", email, e);
                return LinkReport::failed(e);
            }
        };

        // Step 3: advisory profile flag, best-effort.
        let identity = Identity::Authenticated(account_id.to_string());
        match self.ledger.find_succeeded_consultation(&identity).await {
            Ok(Some(_)) => {
                if let Err(e) = self.accounts.mark_consultation_paid(account_id).await {
                    warn!("Could not mark consultation paid for {}: {}", account_id, e);
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Paid-flag lookup failed for {}: {}", account_id, e);
            }
        }

        // Step 4: retire the client-side flags, also best-effort.
        if let Some(client_ref) = client_ref {
            if let Err(e) = self.cache.clear_all(client_ref).await {
                warn!("Session cache clear failed for {}: {}", client_ref, e);
            }
        }

        info!(
            "Linked {} payment(s) and {} submission(s) for {} to account {}",
            payments_linked, submissions_linked, email, account_id
        );

        LinkReport::completed(payments_linked, submissions_linked)
    }
}
