//! Submission Store
//!
//! The one write this workflow performs: flipping a submission from unpaid
//! to paid. Implementations must make that write conditional so concurrent
//! or repeated verifications of the same payment cannot corrupt the record.

mod memory;

pub use memory::MemorySubmissionStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::submission::MarkPaid;

/// Submission storage trait
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Mark a submission paid, only if it is not already paid
    ///
    /// Missing rows are reported as [`MarkPaid::NotFound`], not as an error.
    /// Errors are reserved for connectivity and permission failures.
    async fn mark_paid(
        &self,
        submission_id: &str,
        payment_id: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<MarkPaid>;

    /// Backend name
    fn name(&self) -> &str;
}
