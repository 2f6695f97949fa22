/// Intake form endpoints: submission, eligibility, and the checkout return
use crate::{
    api::middleware::{extract_client_ref, optional_auth},
    billing::{CheckoutVerification, PaymentReturnRequest, PaymentReturnResponse},
    context::AppContext,
    error::{PortalError, PortalResult},
    identity::{normalize_email, Identity},
    intake::{GateDecision, SubmitIntakeRequest},
};
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/intake/session", post(issue_client_session))
        .route("/api/intake/submit", post(submit_intake))
        .route("/api/intake/eligibility", get(check_eligibility))
        .route("/api/intake/payment-return", post(payment_return))
}

#[derive(Debug, Deserialize)]
struct EligibilityQuery {
    email: Option<String>,
}

/// Issue an opaque client session reference
///
/// The front end stores it in device-local storage and replays it in the
/// x-intake-session header so the checkout round trip can be resumed.
async fn issue_client_session() -> Json<serde_json::Value> {
    let client_ref = crate::intake::SessionCache::generate_client_ref();
    Json(serde_json::json!({ "clientRef": client_ref }))
}

/// Submit an intake form
///
/// Runs the access gate first; a denial comes back as 403 with the decision
/// body so the front end can route to signup. An allowed submission is
/// recorded with its payment-derived status and returned together with the
/// needsPayment routing flag.
async fn submit_intake(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(req): Json<SubmitIntakeRequest>,
) -> PortalResult<Response> {
    req.validate()
        .map_err(|e| PortalError::Validation(e.to_string()))?;

    let session = optional_auth(&ctx, &headers).await;
    let account_id = session.as_ref().map(|s| s.account_id.as_str());
    let client_ref = extract_client_ref(&headers);
    let email = normalize_email(&req.email);

    let identity = Identity::resolve(account_id, Some(&email));
    let decision = ctx
        .access_gate
        .can_submit(&identity, client_ref.as_deref())
        .await;

    if !decision.allowed {
        return Ok((StatusCode::FORBIDDEN, Json(decision)).into_response());
    }

    let outcome = ctx
        .recorder
        .submit(&req.form_type, &email, &req.form_data, account_id)
        .await?;

    // Notify the practice inbox; a mail failure never fails the submission
    if ctx.mailer.is_configured() {
        if let Err(e) = ctx
            .mailer
            .send_submission_notification(&req.form_type, &email, &outcome.record.id)
            .await
        {
            tracing::warn!("Failed to send submission notification: {}", e);
        }
    }

    Ok((StatusCode::CREATED, Json(outcome)).into_response())
}

/// Check whether an intake submission would be allowed
async fn check_eligibility(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Query(query): Query<EligibilityQuery>,
) -> Json<GateDecision> {
    let session = optional_auth(&ctx, &headers).await;
    let account_id = session.as_ref().map(|s| s.account_id.as_str());
    let client_ref = extract_client_ref(&headers);

    let identity = Identity::resolve(account_id, query.email.as_deref());
    let decision = ctx
        .access_gate
        .can_submit(&identity, client_ref.as_deref())
        .await;

    Json(decision)
}

/// Handle the visitor's return from the hosted checkout
///
/// Phase 2 of the checkout round trip: verify the reference when the
/// provider API is configured, record the payment (idempotently), persist
/// the pending-account flags, and optimistically promote pending
/// submissions. The provider webhook remains the authoritative path.
async fn payment_return(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(req): Json<PaymentReturnRequest>,
) -> PortalResult<Json<PaymentReturnResponse>> {
    req.validate()
        .map_err(|e| PortalError::Validation(e.to_string()))?;

    let client_ref = extract_client_ref(&headers).ok_or_else(|| {
        PortalError::Validation("Missing x-intake-session header".to_string())
    })?;
    let email = normalize_email(&req.email);

    let (amount_cents, currency) = match ctx.checkout.verify(&req.payment_ref).await? {
        CheckoutVerification::Confirmed {
            amount_cents,
            currency,
        } => (amount_cents, currency),
        CheckoutVerification::Unverified => (
            ctx.config.billing.consultation_fee_cents,
            ctx.config.billing.currency.clone(),
        ),
        CheckoutVerification::Rejected => {
            return Err(PortalError::Billing(format!(
                "Checkout {} did not complete",
                req.payment_ref
            )));
        }
    };

    let payment = ctx
        .payment_ledger
        .record_succeeded(&email, &req.payment_ref, amount_cents, &currency)
        .await?;

    ctx.session_cache
        .set_pending_account_creation(&client_ref, &email, &req.payment_ref)
        .await?;

    let promoted = ctx.recorder.promote_pending(&email).await?;

    Ok(Json(PaymentReturnResponse {
        payment_id: payment.id,
        promoted,
    }))
}
