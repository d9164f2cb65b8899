//! Submission Records
//!
//! A submission is the lead/order row written by the landing page's form.
//! This crate only ever touches its payment fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payment state of a submission
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
}

impl PaymentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Paid => "paid",
        }
    }
}

/// A lead/order record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,

    #[serde(default)]
    pub payment_status: PaymentStatus,

    /// Provider reference that paid this submission; set once
    #[serde(default)]
    pub payment_id: Option<String>,

    #[serde(default)]
    pub payment_date: Option<DateTime<Utc>>,
}

impl Submission {
    /// Fresh, unpaid submission
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            payment_status: PaymentStatus::Unpaid,
            payment_id: None,
            payment_date: None,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }
}

/// Outcome of a conditional "mark paid" write
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarkPaid {
    /// The row was unpaid and is now paid
    Updated,

    /// The row was already paid; nothing was written
    AlreadyPaid { payment_id: Option<String> },

    /// No row with that id
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_defaults_to_unpaid() {
        let submission: Submission = serde_json::from_str(r#"{"id":"form_1"}"#).unwrap();
        assert!(!submission.is_paid());
        assert_eq!(submission, Submission::new("form_1"));
    }
}
