//! Stripe Webhook Handling
//!
//! Push-side counterpart of the verify endpoints: completed checkouts and
//! succeeded PaymentIntents run through the same reconciliation as a
//! client-triggered verification, so whichever arrives first records the
//! payment and the other is a no-op.

use std::sync::Arc;

use checkout_core::{
    CheckoutError, IntentSnapshot, PaymentVerifier, Result, SessionSnapshot, Verification,
};
use stripe::{Event, EventObject, EventType, Webhook};

use crate::checkout::{intent_snapshot, session_snapshot};

/// Parsed webhook event
#[derive(Clone, Debug)]
pub enum WebhookEvent {
    /// Checkout finished; payment may still be pending for async methods
    CheckoutCompleted(SessionSnapshot),

    /// Delayed payment method (e.g. boleto) cleared
    AsyncPaymentSucceeded(SessionSnapshot),

    /// Embedded payment succeeded
    PaymentIntentSucceeded(IntentSnapshot),

    /// Unhandled event type
    Other { event_type: String },
}

/// Webhook handler
pub struct WebhookHandler {
    verifier: Arc<PaymentVerifier>,
    secret: String,
}

impl WebhookHandler {
    pub fn new(verifier: Arc<PaymentVerifier>, secret: impl Into<String>) -> Self {
        Self {
            verifier,
            secret: secret.into(),
        }
    }

    /// Verify webhook signature and parse event
    pub fn parse_event(&self, payload: &str, signature: &str) -> Result<Event> {
        Webhook::construct_event(payload, signature, &self.secret)
            .map_err(|e| CheckoutError::WebhookSignature(e.to_string()))
    }

    /// Process a webhook event
    ///
    /// Returns the reconciliation outcome for payment events, `None` for
    /// events this service ignores.
    pub async fn handle(&self, event: Event) -> Result<Option<Verification>> {
        tracing::info!(event_type = ?event.type_, event_id = %event.id, "Processing Stripe webhook");

        let parsed = parse_webhook_event(&event)?;
        Ok(self.reconcile(parsed).await)
    }

    /// Run a parsed event through the verifier
    async fn reconcile(&self, event: WebhookEvent) -> Option<Verification> {
        match event {
            WebhookEvent::CheckoutCompleted(session)
            | WebhookEvent::AsyncPaymentSucceeded(session) => {
                Some(self.verifier.settle_session(&session).await)
            }
            WebhookEvent::PaymentIntentSucceeded(intent) => {
                Some(self.verifier.settle_intent(&intent, None).await)
            }
            WebhookEvent::Other { event_type } => {
                tracing::debug!(event_type = %event_type, "Unhandled webhook event");
                None
            }
        }
    }
}

/// Parse Stripe event into our event type
fn parse_webhook_event(event: &Event) -> Result<WebhookEvent> {
    match event.type_ {
        EventType::CheckoutSessionCompleted => {
            checkout_session(event).map(WebhookEvent::CheckoutCompleted)
        }

        EventType::CheckoutSessionAsyncPaymentSucceeded => {
            checkout_session(event).map(WebhookEvent::AsyncPaymentSucceeded)
        }

        EventType::PaymentIntentSucceeded => {
            let EventObject::PaymentIntent(intent) = &event.data.object else {
                return Err(CheckoutError::InvalidInput(
                    "Invalid payment intent data".into(),
                ));
            };
            Ok(WebhookEvent::PaymentIntentSucceeded(intent_snapshot(intent)))
        }

        _ => Ok(WebhookEvent::Other {
            event_type: format!("{:?}", event.type_),
        }),
    }
}

fn checkout_session(event: &Event) -> Result<SessionSnapshot> {
    if let EventObject::CheckoutSession(session) = &event.data.object {
        Ok(session_snapshot(session))
    } else {
        Err(CheckoutError::InvalidInput(
            "Invalid checkout session data".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout_core::gateway::{SessionPaymentStatus, SessionStatus};
    use checkout_core::{MemorySubmissionStore, MockPaymentGateway, Submission};
    use serde_json::{Value, json};
    use std::collections::HashMap;

    async fn setup() -> (Arc<MemorySubmissionStore>, WebhookHandler) {
        let store = Arc::new(MemorySubmissionStore::new());
        store.insert(Submission::new("form_1")).await;
        let verifier = Arc::new(PaymentVerifier::new(
            Arc::new(MockPaymentGateway::new()),
            store.clone(),
        ));
        (store, WebhookHandler::new(verifier, "whsec_test"))
    }

    fn handler() -> WebhookHandler {
        let verifier = Arc::new(PaymentVerifier::new(
            Arc::new(MockPaymentGateway::new()),
            Arc::new(MemorySubmissionStore::new()),
        ));
        WebhookHandler::new(verifier, "whsec_test")
    }

    fn event(event_type: &str, object: Value) -> Event {
        serde_json::from_value(json!({
            "id": "evt_test_1",
            "object": "event",
            "api_version": null,
            "created": 1_700_000_100,
            "data": { "object": object },
            "livemode": false,
            "pending_webhooks": 1,
            "request": { "id": null, "idempotency_key": null },
            "type": event_type
        }))
        .unwrap()
    }

    fn completed_session() -> Value {
        json!({
            "id": "cs_test_a1",
            "object": "checkout.session",
            "after_expiration": null,
            "allow_promotion_codes": null,
            "amount_subtotal": 8990,
            "amount_total": 8990,
            "automatic_tax": { "enabled": false, "liability": null, "status": null },
            "billing_address_collection": null,
            "cancel_url": "https://zerocost.test/?canceled=true&form_id=form_1",
            "client_reference_id": "form_1",
            "consent": null,
            "consent_collection": null,
            "created": 1_700_000_000,
            "currency": "brl",
            "custom_fields": [],
            "custom_text": {
                "after_submit": null,
                "shipping_address": null,
                "submit": null,
                "terms_of_service_acceptance": null
            },
            "customer": null,
            "customer_details": null,
            "customer_email": null,
            "expires_at": 1_700_086_400,
            "invoice": null,
            "invoice_creation": null,
            "livemode": false,
            "locale": null,
            "metadata": { "formId": "form_1", "plan": "monthly" },
            "mode": "payment",
            "payment_intent": "pi_test_a1",
            "payment_link": null,
            "payment_method_options": null,
            "payment_method_types": ["card"],
            "payment_status": "paid",
            "phone_number_collection": { "enabled": false },
            "recovered_from": null,
            "setup_intent": null,
            "shipping_address_collection": null,
            "shipping_cost": null,
            "shipping_details": null,
            "shipping_options": [],
            "status": "complete",
            "submit_type": null,
            "subscription": null,
            "success_url": "https://zerocost.test/success?session_id={CHECKOUT_SESSION_ID}&form_id=form_1",
            "total_details": null,
            "url": null
        })
    }

    fn succeeded_intent() -> Value {
        json!({
            "id": "pi_test_b2",
            "object": "payment_intent",
            "amount": 8990,
            "amount_capturable": 0,
            "amount_received": 8990,
            "application": null,
            "application_fee_amount": null,
            "automatic_payment_methods": null,
            "canceled_at": null,
            "cancellation_reason": null,
            "capture_method": "automatic",
            "client_secret": "pi_test_b2_secret_x",
            "confirmation_method": "automatic",
            "created": 1_700_000_000,
            "currency": "brl",
            "customer": null,
            "description": "Zero Cost Website - Monthly plan",
            "invoice": null,
            "last_payment_error": null,
            "latest_charge": null,
            "livemode": false,
            "metadata": { "formId": "form_1", "plan": "monthly" },
            "next_action": null,
            "on_behalf_of": null,
            "payment_method": null,
            "payment_method_options": null,
            "payment_method_types": ["card"],
            "processing": null,
            "receipt_email": null,
            "review": null,
            "setup_future_usage": null,
            "shipping": null,
            "statement_descriptor": null,
            "statement_descriptor_suffix": null,
            "status": "succeeded",
            "transfer_data": null,
            "transfer_group": null
        })
    }

    #[test]
    fn test_bad_signature_rejected() {
        let err = handler()
            .parse_event(r#"{"id":"evt_1"}"#, "t=1,v1=deadbeef")
            .unwrap_err();
        assert!(matches!(err, CheckoutError::WebhookSignature(_)));
    }

    #[test]
    fn test_missing_signature_rejected() {
        assert!(handler().parse_event("{}", "").is_err());
    }

    #[tokio::test]
    async fn test_checkout_completed_marks_submission_paid() {
        let (store, handler) = setup().await;

        let outcome = handler
            .handle(event("checkout.session.completed", completed_session()))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Some(Verification::Persisted {
                form_id: "form_1".into(),
                payment_id: "cs_test_a1".into(),
            })
        );
        let saved = store.get("form_1").await.unwrap();
        assert!(saved.is_paid());
        assert_eq!(saved.payment_id.as_deref(), Some("cs_test_a1"));
    }

    #[tokio::test]
    async fn test_intent_succeeded_marks_submission_paid() {
        let (store, handler) = setup().await;

        let outcome = handler
            .handle(event("payment_intent.succeeded", succeeded_intent()))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Some(Verification::Persisted {
                form_id: "form_1".into(),
                payment_id: "pi_test_b2".into(),
            })
        );
        assert_eq!(
            store.get("form_1").await.unwrap().payment_id.as_deref(),
            Some("pi_test_b2")
        );
    }

    #[tokio::test]
    async fn test_redelivered_event_is_harmless() {
        let (store, handler) = setup().await;

        let first = handler
            .handle(event("checkout.session.completed", completed_session()))
            .await
            .unwrap();
        let second = handler
            .handle(event("checkout.session.completed", completed_session()))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(
            store.get("form_1").await.unwrap().payment_id.as_deref(),
            Some("cs_test_a1")
        );
    }

    #[tokio::test]
    async fn test_unhandled_event_ignored() {
        let (store, handler) = setup().await;

        let outcome = handler
            .handle(event("payment_intent.created", succeeded_intent()))
            .await
            .unwrap();

        assert_eq!(outcome, None);
        assert!(!store.get("form_1").await.unwrap().is_paid());
    }

    #[tokio::test]
    async fn test_checkout_event_with_wrong_object() {
        let (store, handler) = setup().await;

        let err = handler
            .handle(event("checkout.session.completed", succeeded_intent()))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::InvalidInput(_)));
        assert!(!store.get("form_1").await.unwrap().is_paid());
    }

    #[tokio::test]
    async fn test_async_payment_reconciled_like_checkout() {
        let (store, handler) = setup().await;
        let session = SessionSnapshot {
            session_id: "cs_test_boleto".into(),
            status: Some(SessionStatus::Complete),
            payment_status: SessionPaymentStatus::Paid,
            metadata: HashMap::from([("formId".to_string(), "form_1".to_string())]),
        };

        let outcome = handler
            .reconcile(WebhookEvent::AsyncPaymentSucceeded(session))
            .await;

        assert_eq!(outcome.map(|v| v.state()), Some("paid_persisted"));
        assert!(store.get("form_1").await.unwrap().is_paid());
    }
}
