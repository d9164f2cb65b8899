//! Payment Verifier
//!
//! Reconciles provider payment state into the submission store.
//!
//! ```text
//! received ──▶ gateway_checked ──┬──▶ pending
//!                                ├──▶ paid_unlinked
//!                                ├──▶ paid_persisted
//!                                ├──▶ paid_unknown_submission
//!                                ├──▶ paid_conflict
//!                                ├──▶ paid_form_mismatch
//!                                └──▶ paid_persist_failed
//!          (retrieve fails) ─────────▶ gateway_error  (the only Err)
//! ```
//!
//! Once the provider says the money moved, the outcome is a success. Store
//! trouble becomes a warning on that success and an error-level log line for
//! out-of-band reconciliation.

use std::sync::Arc;

use chrono::Utc;

use crate::error::{CheckoutError, Result};
use crate::gateway::{IntentSnapshot, PaymentGateway, SessionSnapshot};
use crate::store::SubmissionStore;
use crate::submission::MarkPaid;

/// Terminal state of one verification call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verification {
    /// Provider has not confirmed payment yet; poll again later
    Pending {
        provider_status: String,
        provider_payment_status: String,
    },

    /// Submission is marked paid by this payment (now or earlier)
    Persisted { form_id: String, payment_id: String },

    /// Paid, but nothing links the payment to a submission
    Unlinked { payment_id: String },

    /// Paid, but the linked submission does not exist
    UnknownSubmission { form_id: String, payment_id: String },

    /// Paid, but the submission was already paid by another payment
    Conflict {
        form_id: String,
        payment_id: String,
        existing_payment_id: Option<String>,
    },

    /// Paid, but the payment belongs to another submission; nothing written
    Mismatch {
        form_id: String,
        linked_form_id: String,
        payment_id: String,
    },

    /// Paid, but the store write failed
    PersistFailed { form_id: String, payment_id: String },
}

impl Verification {
    /// Money has moved
    pub const fn is_paid(&self) -> bool {
        !matches!(self, Self::Pending { .. })
    }

    /// Linked submission id, if any
    pub fn form_id(&self) -> Option<&str> {
        match self {
            Self::Persisted { form_id, .. }
            | Self::UnknownSubmission { form_id, .. }
            | Self::Conflict { form_id, .. }
            | Self::Mismatch { form_id, .. }
            | Self::PersistFailed { form_id, .. } => Some(form_id),
            Self::Pending { .. } | Self::Unlinked { .. } => None,
        }
    }

    /// Client-facing warning for paid-but-not-recorded outcomes
    pub const fn warning(&self) -> Option<&'static str> {
        match self {
            Self::Pending { .. } | Self::Persisted { .. } => None,
            Self::Unlinked { .. } => {
                Some("Payment confirmed, but it is not linked to any form submission.")
            }
            Self::UnknownSubmission { .. } => {
                Some("Payment confirmed, but the linked form submission was not found.")
            }
            Self::Conflict { .. } => {
                Some("Payment confirmed, but the form submission was already paid by another payment.")
            }
            Self::Mismatch { .. } => {
                Some("Payment confirmed, but it belongs to a different form submission.")
            }
            Self::PersistFailed { .. } => {
                Some("Payment confirmed, but the order record could not be updated.")
            }
        }
    }

    /// Short state label for logs
    pub const fn state(&self) -> &'static str {
        match self {
            Self::Pending { .. } => "pending",
            Self::Persisted { .. } => "paid_persisted",
            Self::Unlinked { .. } => "paid_unlinked",
            Self::UnknownSubmission { .. } => "paid_unknown_submission",
            Self::Conflict { .. } => "paid_conflict",
            Self::Mismatch { .. } => "paid_form_mismatch",
            Self::PersistFailed { .. } => "paid_persist_failed",
        }
    }
}

/// Payment verifier
pub struct PaymentVerifier {
    gateway: Arc<dyn PaymentGateway>,
    store: Arc<dyn SubmissionStore>,
}

impl PaymentVerifier {
    pub fn new(gateway: Arc<dyn PaymentGateway>, store: Arc<dyn SubmissionStore>) -> Self {
        Self { gateway, store }
    }

    /// Verify a hosted checkout session (session-based flow)
    ///
    /// The submission is resolved from session metadata.
    pub async fn verify_session(&self, session_id: &str) -> Result<Verification> {
        let session_id = required("sessionId", session_id)?;
        let session = self.gateway.retrieve_checkout_session(session_id).await?;
        Ok(self.settle_session(&session).await)
    }

    /// Reconcile an already-retrieved session (e.g. from a webhook payload)
    pub async fn settle_session(&self, session: &SessionSnapshot) -> Verification {
        if !session.is_settled() {
            tracing::debug!(
                session_id = %session.session_id,
                status = session.status_str(),
                payment_status = session.payment_status.as_str(),
                "Checkout session not paid yet"
            );
            return Verification::Pending {
                provider_status: session.status_str().to_string(),
                provider_payment_status: session.payment_status.as_str().to_string(),
            };
        }

        let form_id = session.form_id().map(str::to_string);
        self.reconcile(form_id, &session.session_id).await
    }

    /// Verify an embedded PaymentIntent (intent-based flow)
    ///
    /// The submission is the one named by the caller, which must match the
    /// intent's own `formId` when the intent carries one.
    pub async fn finalize_intent(
        &self,
        payment_intent_id: &str,
        form_id: Option<&str>,
    ) -> Result<Verification> {
        let payment_intent_id = required("paymentIntentId", payment_intent_id)?;
        let intent = self
            .gateway
            .retrieve_payment_intent(payment_intent_id)
            .await?;
        Ok(self.settle_intent(&intent, form_id).await)
    }

    /// Reconcile an already-retrieved PaymentIntent
    pub async fn settle_intent(&self, intent: &IntentSnapshot, form_id: Option<&str>) -> Verification {
        if !intent.is_settled() {
            tracing::debug!(
                payment_intent_id = %intent.payment_intent_id,
                status = %intent.status,
                "Payment intent not succeeded"
            );
            return Verification::Pending {
                provider_status: intent.status.clone(),
                provider_payment_status: intent.status.clone(),
            };
        }

        let requested = form_id.map(str::trim).filter(|s| !s.is_empty());

        let form_id = match (requested, intent.form_id()) {
            (Some(requested), Some(linked)) if requested != linked => {
                tracing::error!(
                    payment_intent_id = %intent.payment_intent_id,
                    form_id = %requested,
                    linked_form_id = %linked,
                    "Payment intent belongs to another submission; not recording"
                );
                return Verification::Mismatch {
                    form_id: requested.to_string(),
                    linked_form_id: linked.to_string(),
                    payment_id: intent.payment_intent_id.clone(),
                };
            }
            (requested, linked) => requested.or(linked).map(str::to_string),
        };

        self.reconcile(form_id, &intent.payment_intent_id).await
    }

    /// Shared reconciliation for a confirmed payment
    async fn reconcile(&self, form_id: Option<String>, payment_id: &str) -> Verification {
        let outcome = match form_id {
            None => {
                tracing::warn!(
                    payment_id = %payment_id,
                    "Paid checkout carries no formId; cannot link to a submission"
                );
                Verification::Unlinked {
                    payment_id: payment_id.to_string(),
                }
            }
            Some(form_id) => self.persist(form_id, payment_id).await,
        };

        tracing::info!(
            payment_id = %payment_id,
            form_id = ?outcome.form_id(),
            state = outcome.state(),
            "Payment reconciled"
        );
        outcome
    }

    async fn persist(&self, form_id: String, payment_id: &str) -> Verification {
        let payment_id = payment_id.to_string();

        match self.store.mark_paid(&form_id, &payment_id, Utc::now()).await {
            Ok(MarkPaid::Updated) => Verification::Persisted {
                form_id,
                payment_id,
            },
            Ok(MarkPaid::AlreadyPaid {
                payment_id: existing,
            }) if existing.as_deref() == Some(payment_id.as_str()) => {
                tracing::debug!(form_id = %form_id, "Submission already marked paid by this payment");
                Verification::Persisted {
                    form_id,
                    payment_id,
                }
            }
            Ok(MarkPaid::AlreadyPaid {
                payment_id: existing,
            }) => {
                tracing::warn!(
                    form_id = %form_id,
                    payment_id = %payment_id,
                    existing_payment_id = ?existing,
                    "Submission already paid by a different payment; not overwriting"
                );
                Verification::Conflict {
                    form_id,
                    payment_id,
                    existing_payment_id: existing,
                }
            }
            Ok(MarkPaid::NotFound) => {
                tracing::error!(
                    form_id = %form_id,
                    payment_id = %payment_id,
                    "Paid checkout references an unknown submission"
                );
                Verification::UnknownSubmission {
                    form_id,
                    payment_id,
                }
            }
            Err(e) => {
                tracing::error!(
                    form_id = %form_id,
                    payment_id = %payment_id,
                    store = self.store.name(),
                    error = %e,
                    "Failed to mark submission paid; needs manual reconciliation"
                );
                Verification::PersistFailed {
                    form_id,
                    payment_id,
                }
            }
        }
    }
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CheckoutError::InvalidInput(format!("{field} is required")));
    }
    Ok(value)
}
