/// Billing subsystem
///
/// The checkout itself happens on an external hosted provider; this module
/// owns the payment ledger rows and the thin client used to start and verify
/// checkout sessions.

mod checkout;
mod ledger;

pub use checkout::{CheckoutProvider, CheckoutVerification, HostedCheckout};
pub use ledger::PaymentLedger;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to start a hosted checkout
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(email)]
    pub email: String,
}

/// Hosted checkout redirect target
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub url: String,
    pub amount_cents: i64,
    pub currency: String,
}

/// Posted by the front end once the visitor returns from checkout
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReturnRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 200))]
    pub payment_ref: String,
}

/// Outcome of the payment-return reconciliation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReturnResponse {
    pub payment_id: String,
    /// Submissions promoted out of pending_payment
    pub promoted: u64,
}

/// Checkout provider webhook payload (authoritative payment confirmation)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutWebhookEvent {
    pub event: String,
    pub payment_ref: String,
    pub email: String,
    pub amount_cents: i64,
    pub currency: String,
}
