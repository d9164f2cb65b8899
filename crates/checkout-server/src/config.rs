//! Server Configuration
//!
//! Read once at startup. Each adapter config is optional so the server can
//! come up partially configured; endpoints needing a missing adapter answer
//! with a configuration error.

use std::time::Duration;

use checkout_payments::StripeConfig;
use checkout_store::SupabaseConfig;
use serde::Serialize;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 8;

/// Which credentials are present; never their values
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPresence {
    pub stripe_secret_key: bool,
    pub stripe_webhook_secret: bool,
    pub supabase_url: bool,
    pub supabase_service_key: bool,
    pub supabase_anon_key: bool,
}

impl ConfigPresence {
    pub fn from_env() -> Self {
        Self {
            stripe_secret_key: env_present("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: env_present("STRIPE_WEBHOOK_SECRET"),
            supabase_url: env_present("SUPABASE_URL"),
            supabase_service_key: env_present("SUPABASE_SERVICE_KEY"),
            supabase_anon_key: env_present("SUPABASE_ANON_KEY"),
        }
    }
}

/// Process configuration
#[derive(Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub stripe: Option<StripeConfig>,
    pub supabase: Option<SupabaseConfig>,

    /// Fallback origin for return URLs when the request carries none
    pub site_url: Option<String>,

    /// Front-end origin allowed by CORS; any origin when unset
    pub cors_origin: Option<String>,

    pub call_timeout: Duration,
    pub presence: ConfigPresence,
}

impl AppConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let call_timeout = Duration::from_secs(
            env_value("EXTERNAL_CALL_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_CALL_TIMEOUT_SECS),
        );

        let stripe = match StripeConfig::from_env() {
            Ok(config) => Some(config.with_timeout(call_timeout)),
            Err(e) => {
                tracing::warn!("Stripe not configured: {}", e);
                None
            }
        };

        let supabase = match SupabaseConfig::from_env() {
            Ok(config) => Some(config.with_timeout(call_timeout)),
            Err(e) => {
                tracing::warn!("Supabase not configured: {}", e);
                None
            }
        };

        Self {
            bind_addr: env_value("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into()),
            stripe,
            supabase,
            site_url: env_value("SITE_URL"),
            cors_origin: env_value("CORS_ALLOW_ORIGIN"),
            call_timeout,
            presence: ConfigPresence::from_env(),
        }
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_present(name: &str) -> bool {
    env_value(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_serializes_booleans_only() {
        let presence = ConfigPresence {
            stripe_secret_key: true,
            supabase_url: true,
            ..Default::default()
        };
        let json = serde_json::to_value(presence).unwrap();
        assert_eq!(json["stripeSecretKey"], true);
        assert_eq!(json["supabaseAnonKey"], false);
        assert_eq!(json.as_object().unwrap().len(), 5);
    }
}
