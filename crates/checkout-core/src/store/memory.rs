//! In-memory submission store (for development and tests)

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::SubmissionStore;
use crate::error::Result;
use crate::submission::{MarkPaid, PaymentStatus, Submission};

pub struct MemorySubmissionStore {
    submissions: RwLock<HashMap<String, Submission>>,
}

impl Default for MemorySubmissionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySubmissionStore {
    pub fn new() -> Self {
        Self {
            submissions: RwLock::new(HashMap::new()),
        }
    }

    /// Save or replace a submission
    pub async fn insert(&self, submission: Submission) {
        self.submissions
            .write()
            .await
            .insert(submission.id.clone(), submission);
    }

    pub async fn get(&self, id: &str) -> Option<Submission> {
        self.submissions.read().await.get(id).cloned()
    }
}

#[async_trait]
impl SubmissionStore for MemorySubmissionStore {
    async fn mark_paid(
        &self,
        submission_id: &str,
        payment_id: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<MarkPaid> {
        let mut submissions = self.submissions.write().await;

        let Some(submission) = submissions.get_mut(submission_id) else {
            return Ok(MarkPaid::NotFound);
        };

        if submission.is_paid() {
            return Ok(MarkPaid::AlreadyPaid {
                payment_id: submission.payment_id.clone(),
            });
        }

        submission.payment_status = PaymentStatus::Paid;
        submission.payment_id = Some(payment_id.to_string());
        submission.payment_date = Some(paid_at);

        Ok(MarkPaid::Updated)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mark_paid_is_conditional() {
        let store = MemorySubmissionStore::new();
        store.insert(Submission::new("form_1")).await;

        let first = Utc::now();
        assert_eq!(
            store.mark_paid("form_1", "cs_1", first).await.unwrap(),
            MarkPaid::Updated
        );
        assert_eq!(
            store.mark_paid("form_1", "cs_2", Utc::now()).await.unwrap(),
            MarkPaid::AlreadyPaid {
                payment_id: Some("cs_1".into())
            }
        );

        let saved = store.get("form_1").await.unwrap();
        assert_eq!(saved.payment_id.as_deref(), Some("cs_1"));
        assert_eq!(saved.payment_date, Some(first));
    }

    #[tokio::test]
    async fn test_unknown_submission() {
        let store = MemorySubmissionStore::new();
        let outcome = store.mark_paid("nope", "cs_1", Utc::now()).await.unwrap();
        assert_eq!(outcome, MarkPaid::NotFound);
    }
}
