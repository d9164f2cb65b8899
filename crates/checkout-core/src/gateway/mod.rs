//! Payment Gateway Strategy Pattern
//!
//! Defines the interface to the external payment provider. Implementations
//! make one outbound call per method and hold no state of their own.
//!
//! `create_*` calls are not idempotent: each one produces a new provider-side
//! object, so callers must never retry them blindly. `retrieve_*` calls are
//! plain reads.

mod mock;

pub use mock::MockPaymentGateway;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::money::CurrencyCode;

/// Metadata key linking a provider object back to its submission
pub const FORM_ID_KEY: &str = "formId";

/// Parameters for a hosted checkout session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutSessionParams {
    /// Amount in minor units
    pub unit_amount: i64,
    pub currency: CurrencyCode,
    pub description: String,
    pub metadata: HashMap<String, String>,
    pub success_url: String,
    pub cancel_url: String,
}

/// Session created by the provider
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatedSession {
    pub session_id: String,
    pub redirect_url: String,
}

/// Parameters for an embedded PaymentIntent
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentIntentParams {
    /// Amount in minor units
    pub amount: i64,
    pub currency: CurrencyCode,
    pub description: String,
    pub metadata: HashMap<String, String>,
}

/// PaymentIntent created by the provider
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatedIntent {
    pub payment_intent_id: String,
    pub client_secret: String,
}

/// Provider-side lifecycle of a checkout session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Open,
    Complete,
    Expired,
}

impl SessionStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Complete => "complete",
            Self::Expired => "expired",
        }
    }
}

/// Provider-side payment state of a checkout session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPaymentStatus {
    Unpaid,
    Paid,
    NoPaymentRequired,
}

impl SessionPaymentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Paid => "paid",
            Self::NoPaymentRequired => "no_payment_required",
        }
    }
}

/// Read-only view of a checkout session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub session_id: String,
    /// `None` when the provider omits it
    pub status: Option<SessionStatus>,
    pub payment_status: SessionPaymentStatus,
    pub metadata: HashMap<String, String>,
}

impl SessionSnapshot {
    /// Money has moved (or none was owed) and the session is closed
    pub fn is_settled(&self) -> bool {
        self.status == Some(SessionStatus::Complete)
            && matches!(
                self.payment_status,
                SessionPaymentStatus::Paid | SessionPaymentStatus::NoPaymentRequired
            )
    }

    /// Submission id carried in metadata, ignoring blanks
    pub fn form_id(&self) -> Option<&str> {
        self.metadata
            .get(FORM_ID_KEY)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    pub fn status_str(&self) -> &'static str {
        self.status.map_or("unknown", SessionStatus::as_str)
    }
}

/// Read-only view of a PaymentIntent
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntentSnapshot {
    pub payment_intent_id: String,
    /// Provider status string, e.g. `succeeded` or `processing`
    pub status: String,
    pub metadata: HashMap<String, String>,
}

impl IntentSnapshot {
    pub fn is_settled(&self) -> bool {
        self.status == "succeeded"
    }

    pub fn form_id(&self) -> Option<&str> {
        self.metadata
            .get(FORM_ID_KEY)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

/// Payment provider trait (Strategy pattern)
///
/// Implement this for each provider. The orchestrator and verifier work
/// exclusively through this interface.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session
    async fn create_checkout_session(&self, params: CheckoutSessionParams)
    -> Result<CreatedSession>;

    /// Create a PaymentIntent for the embedded payment form
    async fn create_payment_intent(&self, params: PaymentIntentParams) -> Result<CreatedIntent>;

    /// Fetch the current state of a checkout session
    async fn retrieve_checkout_session(&self, session_id: &str) -> Result<SessionSnapshot>;

    /// Fetch the current state of a PaymentIntent
    async fn retrieve_payment_intent(&self, payment_intent_id: &str) -> Result<IntentSnapshot>;

    /// Provider name
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(status: Option<SessionStatus>, payment: SessionPaymentStatus) -> SessionSnapshot {
        SessionSnapshot {
            session_id: "cs_test_1".into(),
            status,
            payment_status: payment,
            metadata: HashMap::from([(FORM_ID_KEY.to_string(), "  ".to_string())]),
        }
    }

    #[test]
    fn test_session_settlement() {
        assert!(snapshot(Some(SessionStatus::Complete), SessionPaymentStatus::Paid).is_settled());
        assert!(
            snapshot(Some(SessionStatus::Complete), SessionPaymentStatus::NoPaymentRequired)
                .is_settled()
        );
        assert!(!snapshot(Some(SessionStatus::Open), SessionPaymentStatus::Paid).is_settled());
        assert!(!snapshot(Some(SessionStatus::Complete), SessionPaymentStatus::Unpaid).is_settled());
        assert!(!snapshot(None, SessionPaymentStatus::Paid).is_settled());
    }

    #[test]
    fn test_blank_form_id_is_absent() {
        let session = snapshot(Some(SessionStatus::Complete), SessionPaymentStatus::Paid);
        assert_eq!(session.form_id(), None);
        assert_eq!(session.status_str(), "complete");
    }
}
