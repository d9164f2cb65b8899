//! Mock Payment Gateway
//!
//! In-process stand-in for the payment provider, for tests and local demos.
//! Sessions start `open`/`unpaid` and intents `requires_payment_method`
//! until a test settles them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{
    CheckoutSessionParams, CreatedIntent, CreatedSession, IntentSnapshot, PaymentGateway,
    PaymentIntentParams, SessionPaymentStatus, SessionSnapshot, SessionStatus,
};
use crate::error::{CheckoutError, Result};

/// Mock gateway recording every create call
#[derive(Default)]
pub struct MockPaymentGateway {
    sessions: Mutex<HashMap<String, SessionSnapshot>>,
    intents: Mutex<HashMap<String, IntentSnapshot>>,
    created_sessions: Mutex<Vec<CheckoutSessionParams>>,
    created_intents: Mutex<Vec<PaymentIntentParams>>,
    unavailable: AtomicBool,
    create_attempts: AtomicUsize,
    retrievals: AtomicUsize,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a provider outage: every call fails with a gateway error
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Insert or replace a session as the provider would report it
    pub async fn put_session(&self, session: SessionSnapshot) {
        self.sessions
            .lock()
            .await
            .insert(session.session_id.clone(), session);
    }

    /// Mark a session complete and paid, as after a successful hosted checkout
    pub async fn complete_session(&self, session_id: &str) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| CheckoutError::NotFound(session_id.to_string()))?;
        session.status = Some(SessionStatus::Complete);
        session.payment_status = SessionPaymentStatus::Paid;
        Ok(())
    }

    /// Set the provider status of a PaymentIntent
    pub async fn set_intent_status(&self, payment_intent_id: &str, status: &str) -> Result<()> {
        let mut intents = self.intents.lock().await;
        let intent = intents
            .get_mut(payment_intent_id)
            .ok_or_else(|| CheckoutError::NotFound(payment_intent_id.to_string()))?;
        intent.status = status.to_string();
        Ok(())
    }

    /// Parameters of every session created so far
    pub async fn created_sessions(&self) -> Vec<CheckoutSessionParams> {
        self.created_sessions.lock().await.clone()
    }

    /// Parameters of every intent created so far
    pub async fn created_intents(&self) -> Vec<PaymentIntentParams> {
        self.created_intents.lock().await.clone()
    }

    /// Number of create calls received, failed ones included
    pub fn create_attempts(&self) -> usize {
        self.create_attempts.load(Ordering::SeqCst)
    }

    /// Number of retrieve calls served
    pub fn retrievals(&self) -> usize {
        self.retrievals.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CheckoutError::Gateway("mock provider unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_checkout_session(
        &self,
        params: CheckoutSessionParams,
    ) -> Result<CreatedSession> {
        self.create_attempts.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let session_id = format!("cs_test_{}", uuid::Uuid::new_v4().simple());
        let redirect_url = format!("https://checkout.example.test/pay/{session_id}");

        self.put_session(SessionSnapshot {
            session_id: session_id.clone(),
            status: Some(SessionStatus::Open),
            payment_status: SessionPaymentStatus::Unpaid,
            metadata: params.metadata.clone(),
        })
        .await;
        self.created_sessions.lock().await.push(params);

        Ok(CreatedSession {
            session_id,
            redirect_url,
        })
    }

    async fn create_payment_intent(&self, params: PaymentIntentParams) -> Result<CreatedIntent> {
        self.create_attempts.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let payment_intent_id = format!("pi_test_{}", uuid::Uuid::new_v4().simple());
        let client_secret = format!("{payment_intent_id}_secret_mock");

        self.intents.lock().await.insert(
            payment_intent_id.clone(),
            IntentSnapshot {
                payment_intent_id: payment_intent_id.clone(),
                status: "requires_payment_method".into(),
                metadata: params.metadata.clone(),
            },
        );
        self.created_intents.lock().await.push(params);

        Ok(CreatedIntent {
            payment_intent_id,
            client_secret,
        })
    }

    async fn retrieve_checkout_session(&self, session_id: &str) -> Result<SessionSnapshot> {
        self.check_available()?;
        self.retrievals.fetch_add(1, Ordering::SeqCst);

        self.sessions
            .lock()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| CheckoutError::NotFound(format!("checkout session {session_id}")))
    }

    async fn retrieve_payment_intent(&self, payment_intent_id: &str) -> Result<IntentSnapshot> {
        self.check_available()?;
        self.retrievals.fetch_add(1, Ordering::SeqCst);

        self.intents
            .lock()
            .await
            .get(payment_intent_id)
            .cloned()
            .ok_or_else(|| {
                CheckoutError::NotFound(format!("payment intent {payment_intent_id}"))
            })
    }

    fn name(&self) -> &str {
        "MockGateway"
    }
}
