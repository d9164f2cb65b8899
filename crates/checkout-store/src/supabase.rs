//! Supabase Submission Store
//!
//! Implementation of `SubmissionStore` over Supabase's PostgREST API.
//!
//! The paid write is conditional on the row not being paid yet, so a second
//! verification can never replace the payment reference of the first.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use checkout_core::{CheckoutError, MarkPaid, PaymentStatus, Result, SubmissionStore};
use reqwest::{RequestBuilder, Response};
use serde::{Deserialize, Serialize};

/// Default table written by the landing page's form
pub const DEFAULT_TABLE: &str = "form_submissions";

/// Default per-call budget for store requests
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

/// PostgREST filter: payment status is null or anything but paid
const NOT_YET_PAID: &str = "(payment_status.is.null,payment_status.neq.paid)";

/// Which Supabase key the store authenticates with
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyKind {
    Service,
    /// Subject to row-level security; writes may silently match nothing
    Anon,
}

/// Supabase connection settings
#[derive(Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: String,
    pub key: String,
    pub key_kind: KeyKind,
    pub table: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("key", &"<redacted>")
            .field("key_kind", &self.key_kind)
            .field("table", &self.table)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SupabaseConfig {
    /// Service-key config with default table and timeout
    pub fn new(url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key: service_key.into(),
            key_kind: KeyKind::Service,
            table: DEFAULT_TABLE.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create from environment variables
    ///
    /// Prefers `SUPABASE_SERVICE_KEY`, falling back to `SUPABASE_ANON_KEY`.
    pub fn from_env() -> Result<Self> {
        let url = env_value("SUPABASE_URL")
            .ok_or_else(|| CheckoutError::Config("SUPABASE_URL not set".into()))?;

        let (key, key_kind) = match (
            env_value("SUPABASE_SERVICE_KEY"),
            env_value("SUPABASE_ANON_KEY"),
        ) {
            (Some(key), _) => (key, KeyKind::Service),
            (None, Some(key)) => {
                tracing::warn!("SUPABASE_SERVICE_KEY not set; falling back to the anon key");
                (key, KeyKind::Anon)
            }
            (None, None) => {
                return Err(CheckoutError::Config(
                    "SUPABASE_SERVICE_KEY or SUPABASE_ANON_KEY must be set".into(),
                ));
            }
        };

        let table = env_value("SUPABASE_SUBMISSIONS_TABLE").unwrap_or_else(|| DEFAULT_TABLE.into());

        Ok(Self {
            url,
            key,
            key_kind,
            table,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Columns written when a submission is paid
#[derive(Debug, Serialize)]
struct PaidColumns<'a> {
    payment_status: PaymentStatus,
    payment_id: &'a str,
    payment_date: DateTime<Utc>,
}

/// Columns read back when the conditional write matched nothing
#[derive(Debug, Deserialize)]
struct PaymentColumns {
    #[serde(default)]
    payment_status: Option<String>,
    #[serde(default)]
    payment_id: Option<String>,
}

/// Supabase submission store
pub struct SupabaseStore {
    http: reqwest::Client,
    config: SupabaseConfig,
}

impl SupabaseStore {
    pub fn new(config: SupabaseConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CheckoutError::Config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    pub const fn key_kind(&self) -> KeyKind {
        self.config.key_kind
    }

    fn table_url(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.url.trim_end_matches('/'),
            self.config.table
        )
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.key)
            .bearer_auth(&self.config.key)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                CheckoutError::Store(format!(
                    "supabase timed out after {}s",
                    self.config.timeout.as_secs()
                ))
            } else {
                CheckoutError::Store(format!("supabase request failed: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CheckoutError::Store(format!(
                "supabase returned {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }
        Ok(response)
    }

    async fn rows<T: serde::de::DeserializeOwned>(&self, request: RequestBuilder) -> Result<Vec<T>> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| CheckoutError::Store(format!("unexpected supabase response: {e}")))
    }

    /// Read the payment columns of one submission
    async fn lookup(&self, submission_id: &str) -> Result<Option<PaymentColumns>> {
        let request = self.authed(self.http.get(self.table_url())).query(&[
            ("id", format!("eq.{submission_id}")),
            ("select", "payment_status,payment_id".to_string()),
        ]);

        Ok(self.rows(request).await?.into_iter().next())
    }
}

#[async_trait]
impl SubmissionStore for SupabaseStore {
    async fn mark_paid(
        &self,
        submission_id: &str,
        payment_id: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<MarkPaid> {
        let request = self
            .authed(self.http.patch(self.table_url()))
            .query(&[
                ("id", format!("eq.{submission_id}")),
                ("or", NOT_YET_PAID.to_string()),
            ])
            .header("Prefer", "return=representation")
            .json(&PaidColumns {
                payment_status: PaymentStatus::Paid,
                payment_id,
                payment_date: paid_at,
            });

        let updated: Vec<serde_json::Value> = self.rows(request).await?;
        if !updated.is_empty() {
            tracing::debug!(submission_id, payment_id, "Submission marked paid");
            return Ok(MarkPaid::Updated);
        }

        match self.lookup(submission_id).await? {
            None => Ok(MarkPaid::NotFound),
            Some(row) if row.payment_status.as_deref() == Some(PaymentStatus::Paid.as_str()) => {
                Ok(MarkPaid::AlreadyPaid {
                    payment_id: row.payment_id,
                })
            }
            Some(_) => Err(CheckoutError::Store(format!(
                "update of unpaid submission {submission_id} matched no rows ({:?} key; check row-level security)",
                self.config.key_kind
            ))),
        }
    }

    fn name(&self) -> &str {
        "supabase"
    }
}
