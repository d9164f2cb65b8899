//! # checkout-core
//!
//! Checkout orchestration and payment reconciliation for the Zero Cost
//! Website landing page.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────┐  start   ┌─────────────────┐  create   ┌─────────────────┐
//! │  Client  │─────────▶│ CheckoutService │──────────▶│ PaymentGateway  │
//! └──────────┘          └─────────────────┘           └─────────────────┘
//!      │ (provider's hosted page or embedded form)             ▲
//!      ▼                                                       │ retrieve
//! ┌──────────┐  verify  ┌─────────────────┐  mark_paid ┌──────┴──────────┐
//! │  Client  │─────────▶│ PaymentVerifier │───────────▶│ SubmissionStore │
//! └──────────┘          └─────────────────┘            └─────────────────┘
//! ```
//!
//! `PaymentGateway` and `SubmissionStore` are the seams: the Stripe and
//! Supabase adapters live in their own crates, and this crate ships
//! in-process implementations of both for tests and local development.

pub mod checkout;
pub mod error;
pub mod gateway;
pub mod money;
pub mod plan;
pub mod store;
pub mod submission;
pub mod verify;

pub use checkout::{CheckoutRequest, CheckoutService, ReturnUrls, StartedCheckout, StartedIntent};
pub use error::{CheckoutError, Result};
pub use gateway::{IntentSnapshot, MockPaymentGateway, PaymentGateway, SessionSnapshot};
pub use money::{CurrencyCode, MajorAmount};
pub use plan::Plan;
pub use store::{MemorySubmissionStore, SubmissionStore};
pub use submission::{MarkPaid, PaymentStatus, Submission};
pub use verify::{PaymentVerifier, Verification};
