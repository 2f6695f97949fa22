/// Billing endpoints: checkout bootstrap and the provider webhook
use crate::{
    billing::{CheckoutRequest, CheckoutResponse, CheckoutWebhookEvent},
    context::AppContext,
    error::{PortalError, PortalResult},
    identity::normalize_email,
};
use axum::{
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use validator::Validate;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/billing/checkout", post(start_checkout))
        .route("/api/billing/webhook", post(checkout_webhook))
}

/// Build the hosted checkout redirect for a visitor
async fn start_checkout(
    State(ctx): State<AppContext>,
    Json(req): Json<CheckoutRequest>,
) -> PortalResult<Json<CheckoutResponse>> {
    req.validate()
        .map_err(|e| PortalError::Validation(e.to_string()))?;

    let email = normalize_email(&req.email);

    Ok(Json(CheckoutResponse {
        url: ctx.checkout.checkout_url(&email),
        amount_cents: ctx.config.billing.consultation_fee_cents,
        currency: ctx.config.billing.currency.clone(),
    }))
}

/// Authoritative payment confirmation from the checkout provider
///
/// Records the payment and promotes pending submissions. Safe against
/// double delivery and against racing the optimistic payment-return
/// handler: the ledger insert is keyed on the provider reference and the
/// promotion only touches rows still in pending_payment.
async fn checkout_webhook(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(event): Json<CheckoutWebhookEvent>,
) -> PortalResult<Json<serde_json::Value>> {
    if let Some(expected) = &ctx.config.billing.webhook_secret {
        let provided = headers
            .get("x-webhook-secret")
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default();
        if provided != expected {
            return Err(PortalError::Authorization("Invalid webhook secret".to_string()));
        }
    }

    if event.event != "checkout.completed" {
        tracing::debug!("Ignoring webhook event {}", event.event);
        return Ok(Json(serde_json::json!({ "received": true })));
    }

    let email = normalize_email(&event.email);

    ctx.payment_ledger
        .record_succeeded(&email, &event.payment_ref, event.amount_cents, &event.currency)
        .await?;

    let promoted = ctx.recorder.promote_pending(&email).await?;

    tracing::info!(
        "Webhook recorded payment {} for {} ({} promoted)",
        event.payment_ref,
        email,
        promoted
    );

    Ok(Json(serde_json::json!({ "received": true, "promoted": promoted })))
}
