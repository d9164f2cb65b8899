//! Zero Cost Website checkout server
//!
//! Axum-based server for the landing page's checkout: session and
//! PaymentIntent creation, payment verification, and Stripe webhooks.

mod config;
mod handlers;
mod routes;
mod state;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use checkout_core::{PaymentGateway, SubmissionStore};
use checkout_payments::StripeGateway;
use checkout_store::SupabaseStore;

use crate::config::AppConfig;
use crate::routes::{cors_layer, router};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    // Payment provider
    let gateway: Option<Arc<dyn PaymentGateway>> = config.stripe.as_ref().map(|stripe| {
        tracing::info!("✓ Stripe configured");
        Arc::new(StripeGateway::new(stripe)) as Arc<dyn PaymentGateway>
    });
    if gateway.is_none() {
        tracing::warn!("⚠ Stripe not configured - checkout disabled");
        tracing::warn!("  Set STRIPE_SECRET_KEY in .env");
    }

    let webhook_secret = config
        .stripe
        .as_ref()
        .and_then(|stripe| stripe.webhook_secret.clone());
    if gateway.is_some() && webhook_secret.is_none() {
        tracing::warn!("⚠ STRIPE_WEBHOOK_SECRET not set - webhooks disabled");
    }

    // Submission store
    let store: Option<Arc<dyn SubmissionStore>> = match config.supabase.clone() {
        Some(supabase) => {
            let store = SupabaseStore::new(supabase)?;
            tracing::info!(key = ?store.key_kind(), "✓ Supabase configured");
            Some(Arc::new(store))
        }
        None => {
            tracing::warn!("⚠ Supabase not configured - verification disabled");
            tracing::warn!("  Set SUPABASE_URL and SUPABASE_SERVICE_KEY in .env");
            None
        }
    };

    if config.site_url.is_none() {
        tracing::debug!("SITE_URL not set; return URLs rely on request headers");
    }

    // Build application state
    let state = AppState::new(
        gateway,
        store,
        webhook_secret,
        config.site_url.clone(),
        config.presence,
    );

    let app = router(state, cors_layer(config.cors_origin.as_deref()));

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 checkout server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!(timeout_secs = config.call_timeout.as_secs(), "External call budget");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health             - Health check");
    tracing::info!("  GET  /checkout/config    - Configuration presence");
    tracing::info!("  POST /checkout/create    - Create checkout session");
    tracing::info!("  POST /checkout/session   - Create session with redirect URL");
    tracing::info!("  POST /checkout/intent    - Create PaymentIntent");
    tracing::info!("  POST /checkout/verify    - Verify checkout session");
    tracing::info!("  POST /checkout/finalize  - Verify PaymentIntent");
    tracing::info!("  POST /webhook/stripe     - Stripe webhooks");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
