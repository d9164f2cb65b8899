//! Checkout Orchestrator
//!
//! Turns a landing-page purchase request into a provider-side checkout
//! session or PaymentIntent. Gateway failures are returned as-is and never
//! retried: a retried create is a second session and potentially a second
//! charge.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{CheckoutError, Result};
use crate::gateway::{
    CheckoutSessionParams, FORM_ID_KEY, PaymentGateway, PaymentIntentParams,
};
use crate::money::{CurrencyCode, MajorAmount};
use crate::plan::Plan;

const MAX_FORM_ID_LEN: usize = 128;

/// Request to start a checkout
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub plan: Plan,

    /// Major units; defaults to the plan's listed price
    #[serde(default)]
    pub amount: Option<MajorAmount>,

    /// ISO code; defaults to BRL
    #[serde(default)]
    pub currency: Option<String>,

    /// Submission to link; generated when absent
    #[serde(default)]
    pub form_id: Option<String>,
}

/// Where the provider sends the visitor afterwards
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReturnUrls {
    pub success_url: String,
    pub cancel_url: String,
}

impl ReturnUrls {
    /// Build return URLs on the site the visitor came from
    ///
    /// The success URL carries the provider's session placeholder so the
    /// landing page can call verify on return.
    pub fn for_origin(origin: &str, form_id: &str) -> Result<Self> {
        let origin = origin.trim().trim_end_matches('/');
        if !(origin.starts_with("https://") || origin.starts_with("http://")) {
            return Err(CheckoutError::InvalidInput(format!(
                "cannot build return URLs from origin {origin:?}"
            )));
        }

        Ok(Self {
            success_url: format!(
                "{origin}/success?session_id={{CHECKOUT_SESSION_ID}}&form_id={form_id}"
            ),
            cancel_url: format!("{origin}/?canceled=true&form_id={form_id}"),
        })
    }
}

/// Result of starting a hosted checkout
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StartedCheckout {
    pub form_id: String,
    pub session_id: String,
    pub redirect_url: String,
}

/// Result of starting an embedded payment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StartedIntent {
    pub form_id: String,
    pub payment_intent_id: String,
    pub client_secret: String,
}

/// Validated charge, ready for the gateway
#[derive(Debug)]
struct Charge {
    form_id: String,
    amount: i64,
    currency: CurrencyCode,
    description: String,
    metadata: HashMap<String, String>,
}

impl Charge {
    fn from_request(request: CheckoutRequest) -> Result<Self> {
        if request.plan.as_str().is_empty() {
            return Err(CheckoutError::InvalidInput("plan is required".into()));
        }

        let form_id = match request.form_id {
            Some(id) => validate_form_id(&id)?,
            None => uuid::Uuid::new_v4().to_string(),
        };

        let amount = request
            .amount
            .or_else(|| request.plan.default_amount())
            .ok_or_else(|| {
                CheckoutError::InvalidInput(format!(
                    "amount is required for plan {:?}",
                    request.plan.as_str()
                ))
            })?
            .to_minor_units()?;

        let currency = match request.currency.as_deref() {
            Some(code) => CurrencyCode::parse(code)?,
            None => CurrencyCode::default(),
        };

        let metadata = HashMap::from([
            (FORM_ID_KEY.to_string(), form_id.clone()),
            ("plan".to_string(), request.plan.as_str().to_string()),
        ]);

        Ok(Self {
            form_id,
            amount,
            currency,
            description: request.plan.description(),
            metadata,
        })
    }
}

fn validate_form_id(id: &str) -> Result<String> {
    let id = id.trim();
    let valid = !id.is_empty()
        && id.len() <= MAX_FORM_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(id.to_string())
    } else {
        Err(CheckoutError::InvalidInput(
            "formId must be 1-128 letters, digits, '-' or '_'".into(),
        ))
    }
}

/// Checkout orchestrator
pub struct CheckoutService {
    gateway: Arc<dyn PaymentGateway>,
}

impl CheckoutService {
    pub fn new(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { gateway }
    }

    /// Create a hosted checkout session
    ///
    /// Returns both the session id (client-side redirect) and the provider
    /// URL (server-side redirect).
    pub async fn start_session(
        &self,
        request: CheckoutRequest,
        origin: &str,
    ) -> Result<StartedCheckout> {
        let charge = Charge::from_request(request)?;
        let urls = ReturnUrls::for_origin(origin, &charge.form_id)?;

        let created = self
            .gateway
            .create_checkout_session(CheckoutSessionParams {
                unit_amount: charge.amount,
                currency: charge.currency.clone(),
                description: charge.description,
                metadata: charge.metadata,
                success_url: urls.success_url,
                cancel_url: urls.cancel_url,
            })
            .await?;

        tracing::info!(
            session_id = %created.session_id,
            form_id = %charge.form_id,
            amount = charge.amount,
            currency = %charge.currency,
            gateway = self.gateway.name(),
            "Created checkout session"
        );

        Ok(StartedCheckout {
            form_id: charge.form_id,
            session_id: created.session_id,
            redirect_url: created.redirect_url,
        })
    }

    /// Create a PaymentIntent for the embedded payment form
    pub async fn start_payment_intent(&self, request: CheckoutRequest) -> Result<StartedIntent> {
        let charge = Charge::from_request(request)?;

        let created = self
            .gateway
            .create_payment_intent(PaymentIntentParams {
                amount: charge.amount,
                currency: charge.currency.clone(),
                description: charge.description,
                metadata: charge.metadata,
            })
            .await?;

        tracing::info!(
            payment_intent_id = %created.payment_intent_id,
            form_id = %charge.form_id,
            amount = charge.amount,
            currency = %charge.currency,
            "Created payment intent"
        );

        Ok(StartedIntent {
            form_id: charge.form_id,
            payment_intent_id: created.payment_intent_id,
            client_secret: created.client_secret,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockPaymentGateway;
    use rust_decimal_macros::dec;

    fn service() -> (Arc<MockPaymentGateway>, CheckoutService) {
        let gateway = Arc::new(MockPaymentGateway::new());
        (gateway.clone(), CheckoutService::new(gateway))
    }

    fn request(plan: &str, amount: Option<MajorAmount>) -> CheckoutRequest {
        CheckoutRequest {
            plan: Plan::parse(plan),
            amount,
            currency: None,
            form_id: None,
        }
    }

    #[tokio::test]
    async fn test_amount_converted_once() {
        let (gateway, service) = service();
        let started = service
            .start_session(
                request("monthly", Some(MajorAmount::new(dec!(89.90)))),
                "https://zerocost.test",
            )
            .await
            .unwrap();

        let created = gateway.created_sessions().await;
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].unit_amount, 8990);
        assert_eq!(created[0].currency.as_str(), "brl");
        assert_eq!(created[0].description, "Zero Cost Website - Monthly plan");
        assert_eq!(created[0].metadata.get(FORM_ID_KEY), Some(&started.form_id));
        assert!(
            created[0]
                .success_url
                .starts_with("https://zerocost.test/success?session_id={CHECKOUT_SESSION_ID}")
        );
    }

    #[tokio::test]
    async fn test_plan_price_used_when_amount_absent() {
        let (gateway, service) = service();
        service
            .start_session(request("annual", None), "https://zerocost.test/")
            .await
            .unwrap();
        assert_eq!(gateway.created_sessions().await[0].unit_amount, 89900);
    }

    #[tokio::test]
    async fn test_form_id_kept_when_supplied() {
        let (_, service) = service();
        let mut req = request("test", None);
        req.form_id = Some("lead-42".into());

        let started = service
            .start_session(req, "http://localhost:5173")
            .await
            .unwrap();
        assert_eq!(started.form_id, "lead-42");
        assert!(started.redirect_url.contains(&started.session_id));
    }

    #[tokio::test]
    async fn test_invalid_inputs_never_reach_gateway() {
        let (gateway, service) = service();

        let zero = request("monthly", Some(MajorAmount::new(dec!(0))));
        let custom_without_amount = request("enterprise", None);
        let mut bad_currency = request("monthly", None);
        bad_currency.currency = Some("real".into());

        for req in [zero, custom_without_amount, bad_currency] {
            let err = service
                .start_session(req, "https://zerocost.test")
                .await
                .unwrap_err();
            assert!(matches!(err, CheckoutError::InvalidInput(_)));
        }

        let err = service
            .start_session(request("monthly", None), "zerocost.test")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidInput(_)));
        assert_eq!(gateway.create_attempts(), 0);
    }

    #[tokio::test]
    async fn test_gateway_failure_not_retried() {
        let (gateway, service) = service();
        gateway.set_unavailable(true);

        let err = service
            .start_session(request("monthly", None), "https://zerocost.test")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Gateway(_)));
        assert_eq!(gateway.create_attempts(), 1);

        let err = service
            .start_payment_intent(request("monthly", None))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Gateway(_)));
        assert_eq!(gateway.create_attempts(), 2);
        assert!(gateway.created_intents().await.is_empty());
    }

    #[tokio::test]
    async fn test_payment_intent_started() {
        let (gateway, service) = service();
        let started = service
            .start_payment_intent(request("monthly", None))
            .await
            .unwrap();

        assert!(started.client_secret.starts_with(&started.payment_intent_id));
        let intents = gateway.created_intents().await;
        assert_eq!(intents[0].amount, 8990);
        assert_eq!(intents[0].metadata.get(FORM_ID_KEY), Some(&started.form_id));
    }

    #[test]
    fn test_form_id_validation() {
        assert!(validate_form_id("abc_123-x").is_ok());
        assert!(validate_form_id("").is_err());
        assert!(validate_form_id("a&b=c").is_err());
        assert!(validate_form_id(&"x".repeat(129)).is_err());
    }
}
