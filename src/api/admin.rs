/// Admin dashboard endpoints
use crate::{
    api::middleware::require_admin,
    context::AppContext,
    db::models::{PaymentRecord, SubmissionRecord, SubmissionStatus},
    error::{PortalError, PortalResult},
};
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/admin/submissions", get(list_submissions))
        .route("/api/admin/submissions/:id/status", post(update_submission_status))
        .route("/api/admin/payments", get(list_payments))
}

#[derive(Debug, Deserialize)]
struct SubmissionFilter {
    status: Option<String>,
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct StatusUpdate {
    status: String,
}

/// List intake submissions, optionally filtered by status
async fn list_submissions(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Query(filter): Query<SubmissionFilter>,
) -> PortalResult<Json<Vec<SubmissionRecord>>> {
    require_admin(&ctx, &headers).await?;

    let status = match filter.status.as_deref() {
        Some(s) => Some(
            SubmissionStatus::parse(s)
                .ok_or_else(|| PortalError::Validation(format!("Unknown status: {}", s)))?,
        ),
        None => None,
    };

    let limit = filter.limit.unwrap_or(100).clamp(1, 500);
    let submissions = ctx.recorder.list_by_status(status, limit).await?;

    Ok(Json(submissions))
}

/// Operator-driven status transition
async fn update_submission_status(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> PortalResult<Json<SubmissionRecord>> {
    require_admin(&ctx, &headers).await?;

    let status = SubmissionStatus::parse(&update.status)
        .ok_or_else(|| PortalError::Validation(format!("Unknown status: {}", update.status)))?;

    // pending_payment is owned by the payment workflow; operators move
    // submissions through the review states only.
    if status == SubmissionStatus::PendingPayment {
        return Err(PortalError::Validation(
            "Submissions cannot be moved back to pending_payment".to_string(),
        ));
    }

    let record = ctx.recorder.update_status(&id, status).await?;

    Ok(Json(record))
}

/// Recent payments (admin dashboard)
async fn list_payments(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> PortalResult<Json<Vec<PaymentRecord>>> {
    require_admin(&ctx, &headers).await?;

    let payments = ctx.payment_ledger.list_recent(100).await?;

    Ok(Json(payments))
}
