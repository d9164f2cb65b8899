//! # checkout-payments
//!
//! Stripe implementation of the checkout `PaymentGateway`, plus webhook
//! handling.
//!
//! ## Integration shapes
//!
//! ### 1. Stripe Checkout (Hosted)
//!
//! **Flow:** Landing page → Stripe's hosted page → `/success?session_id=...`
//!
//! ```text
//! ┌──────────────┐     ┌─────────────────┐     ┌──────────────┐
//! │ Landing page │────▶│  Stripe Hosted  │────▶│ Landing page │
//! │  (pricing)   │     │  Checkout Page  │     │  (success)   │
//! └──────────────┘     └─────────────────┘     └──────────────┘
//! ```
//!
//! The success page calls `POST /checkout/verify` with the session id.
//!
//! ### 2. Payment Element (Embedded)
//!
//! **Flow:** A PaymentIntent's client secret drives Stripe.js on the page;
//! after confirmation the page calls `POST /checkout/finalize` with the
//! intent id and its form id.
//!
//! Either way `checkout.session.completed` / `payment_intent.succeeded`
//! webhooks reconcile the same record, and duplicate reconciliation is
//! harmless.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use checkout_payments::{StripeConfig, StripeGateway};
//!
//! let gateway = StripeGateway::new(&StripeConfig::from_env()?);
//! let checkout = CheckoutService::new(Arc::new(gateway));
//! ```
#![cfg_attr(test, recursion_limit = "256")]

mod checkout;
mod webhook;

pub use checkout::{DEFAULT_TIMEOUT, StripeConfig, StripeGateway};
pub use webhook::{WebhookEvent, WebhookHandler};
