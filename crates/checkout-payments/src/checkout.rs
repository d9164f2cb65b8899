//! Stripe Gateway
//!
//! `PaymentGateway` over Stripe Checkout Sessions (hosted) and
//! PaymentIntents (embedded). Every call is bounded by the configured timeout.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use checkout_core::gateway::{
    CheckoutSessionParams, CreatedIntent, CreatedSession, FORM_ID_KEY, IntentSnapshot,
    PaymentGateway, PaymentIntentParams, SessionPaymentStatus, SessionSnapshot, SessionStatus,
};
use checkout_core::money::CurrencyCode;
use checkout_core::{CheckoutError, Result};
use stripe::{
    CheckoutSession as StripeCheckoutSession, CheckoutSessionId, CheckoutSessionMode,
    CheckoutSessionPaymentStatus, CheckoutSessionStatus, Client, CreateCheckoutSession,
    CreateCheckoutSessionLineItems, CreateCheckoutSessionLineItemsPriceData,
    CreateCheckoutSessionLineItemsPriceDataProductData, CreatePaymentIntent, Currency,
    PaymentIntent, PaymentIntentId, StripeError,
};

/// Default per-call budget for Stripe requests
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

/// Stripe credentials and call budget
#[derive(Clone)]
pub struct StripeConfig {
    pub secret_key: String,

    /// Signing secret for `/webhook/stripe`; webhooks are refused without it
    pub webhook_secret: Option<String>,

    pub timeout: Duration,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"<redacted>")
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl StripeConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            webhook_secret: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| CheckoutError::Config("STRIPE_SECRET_KEY not set".into()))?;

        let webhook_secret = std::env::var("STRIPE_WEBHOOK_SECRET")
            .ok()
            .filter(|v| !v.trim().is_empty());

        Ok(Self {
            secret_key,
            webhook_secret,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Stripe client wrapper
pub struct StripeGateway {
    client: Client,
    timeout: Duration,
}

impl StripeGateway {
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            client: Client::new(config.secret_key.clone()),
            timeout: config.timeout,
        }
    }

    /// Run one Stripe call under the time budget
    async fn call<T>(
        &self,
        request: impl Future<Output = std::result::Result<T, StripeError>> + Send,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result.map_err(|e| map_stripe_error(e, self.timeout)),
            Err(_) => Err(CheckoutError::Timeout {
                service: "stripe",
                secs: self.timeout.as_secs(),
            }),
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(
        &self,
        params: CheckoutSessionParams,
    ) -> Result<CreatedSession> {
        let currency = stripe_currency(&params.currency)?;

        let mut create = CreateCheckoutSession::new();
        create.mode = Some(CheckoutSessionMode::Payment);
        create.success_url = Some(&params.success_url);
        create.cancel_url = Some(&params.cancel_url);
        create.client_reference_id = params.metadata.get(FORM_ID_KEY).map(String::as_str);
        create.metadata = Some(params.metadata.clone());
        create.line_items = Some(vec![CreateCheckoutSessionLineItems {
            quantity: Some(1),
            price_data: Some(CreateCheckoutSessionLineItemsPriceData {
                currency,
                unit_amount: Some(params.unit_amount),
                product_data: Some(CreateCheckoutSessionLineItemsPriceDataProductData {
                    name: params.description.clone(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }]);

        let session = self
            .call(StripeCheckoutSession::create(&self.client, create))
            .await?;

        let redirect_url = session
            .url
            .ok_or_else(|| CheckoutError::Gateway("No checkout URL returned".into()))?;

        Ok(CreatedSession {
            session_id: session.id.to_string(),
            redirect_url,
        })
    }

    async fn create_payment_intent(&self, params: PaymentIntentParams) -> Result<CreatedIntent> {
        let currency = stripe_currency(&params.currency)?;

        let mut create = CreatePaymentIntent::new(params.amount, currency);
        create.description = Some(&params.description);
        create.metadata = Some(params.metadata.clone());

        let intent = self.call(PaymentIntent::create(&self.client, create)).await?;

        let client_secret = intent
            .client_secret
            .ok_or_else(|| CheckoutError::Gateway("No client secret returned".into()))?;

        Ok(CreatedIntent {
            payment_intent_id: intent.id.to_string(),
            client_secret,
        })
    }

    async fn retrieve_checkout_session(&self, session_id: &str) -> Result<SessionSnapshot> {
        let id: CheckoutSessionId = session_id
            .parse()
            .map_err(|_| CheckoutError::NotFound(format!("checkout session {session_id}")))?;

        let session = self
            .call(StripeCheckoutSession::retrieve(&self.client, &id, &[]))
            .await?;

        Ok(session_snapshot(&session))
    }

    async fn retrieve_payment_intent(&self, payment_intent_id: &str) -> Result<IntentSnapshot> {
        let id: PaymentIntentId = payment_intent_id.parse().map_err(|_| {
            CheckoutError::NotFound(format!("payment intent {payment_intent_id}"))
        })?;

        let intent = self
            .call(PaymentIntent::retrieve(&self.client, &id, &[]))
            .await?;

        Ok(intent_snapshot(&intent))
    }

    fn name(&self) -> &str {
        "stripe"
    }
}

/// Read-only view of a Stripe checkout session
pub(crate) fn session_snapshot(session: &StripeCheckoutSession) -> SessionSnapshot {
    SessionSnapshot {
        session_id: session.id.to_string(),
        status: session.status.map(session_status),
        payment_status: payment_status(session.payment_status),
        metadata: session.metadata.clone().unwrap_or_default(),
    }
}

/// Read-only view of a Stripe PaymentIntent
pub(crate) fn intent_snapshot(intent: &PaymentIntent) -> IntentSnapshot {
    IntentSnapshot {
        payment_intent_id: intent.id.to_string(),
        status: intent.status.to_string(),
        metadata: intent.metadata.clone(),
    }
}

const fn session_status(status: CheckoutSessionStatus) -> SessionStatus {
    match status {
        CheckoutSessionStatus::Open => SessionStatus::Open,
        CheckoutSessionStatus::Complete => SessionStatus::Complete,
        CheckoutSessionStatus::Expired => SessionStatus::Expired,
    }
}

const fn payment_status(status: CheckoutSessionPaymentStatus) -> SessionPaymentStatus {
    match status {
        CheckoutSessionPaymentStatus::Paid => SessionPaymentStatus::Paid,
        CheckoutSessionPaymentStatus::Unpaid => SessionPaymentStatus::Unpaid,
        CheckoutSessionPaymentStatus::NoPaymentRequired => SessionPaymentStatus::NoPaymentRequired,
    }
}

fn stripe_currency(code: &CurrencyCode) -> Result<Currency> {
    code.as_str()
        .parse()
        .map_err(|_| CheckoutError::Gateway(format!("Stripe does not support currency {code}")))
}

/// Map a Stripe failure onto the checkout taxonomy
fn map_stripe_error(err: StripeError, timeout: Duration) -> CheckoutError {
    match err {
        StripeError::Stripe(request) if request.http_status == 404 => CheckoutError::NotFound(
            request
                .message
                .unwrap_or_else(|| "No such object".to_string()),
        ),
        StripeError::Timeout => CheckoutError::Timeout {
            service: "stripe",
            secs: timeout.as_secs(),
        },
        other => CheckoutError::Gateway(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            session_status(CheckoutSessionStatus::Complete),
            SessionStatus::Complete
        );
        assert_eq!(
            payment_status(CheckoutSessionPaymentStatus::NoPaymentRequired),
            SessionPaymentStatus::NoPaymentRequired
        );
    }

    #[test]
    fn test_currency_mapping() {
        assert_eq!(
            stripe_currency(&CurrencyCode::parse("BRL").unwrap()).unwrap(),
            Currency::BRL
        );
        let err = stripe_currency(&CurrencyCode::parse("zzz").unwrap()).unwrap_err();
        assert!(matches!(err, CheckoutError::Gateway(_)));
    }

    #[test]
    fn test_error_mapping() {
        let timeout = map_stripe_error(StripeError::Timeout, DEFAULT_TIMEOUT);
        assert!(matches!(timeout, CheckoutError::Timeout { secs: 8, .. }));

        let client = map_stripe_error(StripeError::ClientError("tls".into()), DEFAULT_TIMEOUT);
        assert!(matches!(client, CheckoutError::Gateway(_)));
    }

    #[test]
    fn test_config_debug_redacts_secrets() {
        let config = StripeConfig::new("sk_test_123").with_timeout(Duration::from_secs(3));
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk_test_123"));
        assert!(debug.contains("3s"));
    }

    #[tokio::test]
    async fn test_malformed_ids_are_not_found() {
        let gateway = StripeGateway::new(&StripeConfig::new("sk_test_123"));
        let err = gateway
            .retrieve_checkout_session("not-a-session")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::NotFound(_)));
    }
}
