//! Error Types

use thiserror::Error;

/// Result type alias for checkout operations
pub type Result<T> = std::result::Result<T, CheckoutError>;

/// Checkout error taxonomy
#[derive(Error, Debug)]
pub enum CheckoutError {
    /// Missing or invalid caller-supplied field
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Payment provider does not know the requested object
    #[error("Not found: {0}")]
    NotFound(String),

    /// Payment provider call failed (transport, auth, rejected parameters)
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// An external call exceeded its time budget
    #[error("Timed out after {secs}s calling {service}")]
    Timeout { service: &'static str, secs: u64 },

    /// Submission store call failed (connectivity, permissions)
    #[error("Store error: {0}")]
    Store(String),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    WebhookSignature(String),

    /// Required configuration is absent
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CheckoutError {
    /// Check if the failure is transient (provider, timeout or store)
    ///
    /// Reported to clients so they know whether polling again can help. It
    /// says nothing about replaying a create: a second create is a second
    /// session.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Gateway(_) | Self::Timeout { .. } | Self::Store(_)
        )
    }

    /// Whether this error is the caller's fault rather than a server fault
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::NotFound(_) | Self::WebhookSignature(_)
        )
    }

    /// Get a client-safe message
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput(msg) => msg.clone(),
            Self::NotFound(_) => "Payment session not found.".into(),
            Self::Gateway(_) | Self::Timeout { .. } => {
                "Payment provider is unavailable. Please try again.".into()
            }
            Self::Store(_) => "Could not save your order. Please contact support.".into(),
            Self::WebhookSignature(_) => "Invalid signature.".into(),
            Self::Config(_) => "Service configuration error.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_hides_detail() {
        let err = CheckoutError::Gateway("sk_live_secret rejected".into());
        assert!(!err.user_message().contains("sk_live"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_input_errors_are_client_errors() {
        let err = CheckoutError::InvalidInput("sessionId is required".into());
        assert!(err.is_client_error());
        assert_eq!(err.user_message(), "sessionId is required");
        assert!(!CheckoutError::Config("missing".into()).is_client_error());
        assert!(!err.is_retryable());
    }
}
