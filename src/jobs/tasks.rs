/// Background task implementations
use crate::{context::AppContext, error::PortalResult};

/// Delete sessions past their expiry; returns rows removed
pub async fn cleanup_expired_sessions(ctx: &AppContext) -> PortalResult<u64> {
    ctx.account_manager.cleanup_expired_sessions().await
}

/// Promote pending_payment submissions whose email has a succeeded
/// consultation payment on file; returns rows promoted.
///
/// Re-running is harmless: promotion only touches rows still in
/// pending_payment.
pub async fn reconcile_paid_submissions(ctx: &AppContext) -> PortalResult<u64> {
    let emails = ctx.payment_ledger.emails_awaiting_promotion().await?;

    let mut promoted = 0;
    for email in emails {
        promoted += ctx.recorder.promote_pending(&email).await?;
    }

    Ok(promoted)
}
