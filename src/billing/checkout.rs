/// Hosted checkout provider client
///
/// The visitor pays on the provider's hosted page, so the portal only needs
/// to build the redirect URL and, when API credentials are configured,
/// verify a returned checkout reference.
use crate::{
    config::BillingConfig,
    error::{PortalError, PortalResult},
};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

/// Result of verifying a checkout reference with the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutVerification {
    /// Provider confirms the checkout completed
    Confirmed { amount_cents: i64, currency: String },
    /// Provider knows the reference but the checkout did not complete
    Rejected,
    /// No provider API configured; the redirect is trusted optimistically
    /// and the webhook remains the authoritative confirmation
    Unverified,
}

#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    /// Build the hosted checkout URL for an email
    fn checkout_url(&self, email: &str) -> String;

    /// Verify a checkout reference the visitor returned with
    async fn verify(&self, payment_ref: &str) -> PortalResult<CheckoutVerification>;
}

/// Checkout session shape returned by the provider API
#[derive(Debug, Deserialize)]
struct ProviderSession {
    status: String,
    amount_cents: i64,
    currency: String,
}

/// reqwest-backed provider client
pub struct HostedCheckout {
    http: reqwest::Client,
    config: BillingConfig,
}

impl HostedCheckout {
    pub fn new(config: BillingConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl CheckoutProvider for HostedCheckout {
    fn checkout_url(&self, email: &str) -> String {
        format!(
            "{}?email={}&amount={}&currency={}",
            self.config.checkout_url,
            email,
            self.config.consultation_fee_cents,
            self.config.currency
        )
    }

    async fn verify(&self, payment_ref: &str) -> PortalResult<CheckoutVerification> {
        let Some(api_url) = &self.config.provider_api_url else {
            debug!("Checkout API not configured; accepting {} unverified", payment_ref);
            return Ok(CheckoutVerification::Unverified);
        };

        let mut request = self
            .http
            .get(format!("{}/sessions/{}", api_url, payment_ref));
        if let Some(key) = &self.config.provider_api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PortalError::Billing(format!("Checkout verification failed: {}", e)))?;

        if !response.status().is_success() {
            return Ok(CheckoutVerification::Rejected);
        }

        let session: ProviderSession = response
            .json()
            .await
            .map_err(|e| PortalError::Billing(format!("Malformed provider response: {}", e)))?;

        if session.status == "complete" || session.status == "succeeded" {
            Ok(CheckoutVerification::Confirmed {
                amount_cents: session.amount_cents,
                currency: session.currency,
            })
        } else {
            Ok(CheckoutVerification::Rejected)
        }
    }
}
