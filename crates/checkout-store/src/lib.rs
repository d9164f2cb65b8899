//! # checkout-store
//!
//! Persistent `SubmissionStore` backends for the checkout service.
//!
//! ## Backends
//!
//! - **Supabase** (default): PostgREST over HTTPS, authenticated with the
//!   project's service key (or the anon key as a fallback)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use checkout_store::{SupabaseConfig, SupabaseStore};
//!
//! let store = SupabaseStore::new(SupabaseConfig::from_env()?)?;
//! let verifier = PaymentVerifier::new(gateway, Arc::new(store));
//! ```

pub mod supabase;

pub use supabase::{KeyKind, SupabaseConfig, SupabaseStore};

// Re-export core types for convenience
pub use checkout_core::{MarkPaid, Submission, SubmissionStore};
