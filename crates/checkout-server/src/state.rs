//! Application State

use std::sync::Arc;

use checkout_core::{CheckoutService, PaymentGateway, PaymentVerifier, SubmissionStore};
use checkout_payments::WebhookHandler;

use crate::config::ConfigPresence;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Checkout orchestrator (None if the payment provider is not configured)
    pub checkout: Option<Arc<CheckoutService>>,

    /// Payment verifier (needs both the provider and the store)
    pub verifier: Option<Arc<PaymentVerifier>>,

    /// Stripe webhook receiver (needs the verifier and a signing secret)
    pub webhooks: Option<Arc<WebhookHandler>>,

    /// Fallback origin for return URLs
    pub site_url: Option<String>,

    pub presence: ConfigPresence,
}

impl AppState {
    /// Wire services from whichever adapters are available
    pub fn new(
        gateway: Option<Arc<dyn PaymentGateway>>,
        store: Option<Arc<dyn SubmissionStore>>,
        webhook_secret: Option<String>,
        site_url: Option<String>,
        presence: ConfigPresence,
    ) -> Self {
        let checkout = gateway
            .clone()
            .map(|gateway| Arc::new(CheckoutService::new(gateway)));

        let verifier = match (gateway, store) {
            (Some(gateway), Some(store)) => Some(Arc::new(PaymentVerifier::new(gateway, store))),
            _ => None,
        };

        let webhooks = match (&verifier, webhook_secret) {
            (Some(verifier), Some(secret)) => {
                Some(Arc::new(WebhookHandler::new(verifier.clone(), secret)))
            }
            _ => None,
        };

        Self {
            checkout,
            verifier,
            webhooks,
            site_url,
            presence,
        }
    }
}
