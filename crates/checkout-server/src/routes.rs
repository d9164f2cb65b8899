//! Router

use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{
    config_status, create_checkout, create_intent, create_session, finalize_payment,
    health_check, stripe_webhook, verify_payment,
};
use crate::state::AppState;

/// CORS for the landing page
///
/// Restricted to `origin` when it is a valid header value, permissive
/// otherwise. Preflight `OPTIONS` requests are answered by the layer.
pub fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let allow_origin = match origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => AllowOrigin::exact(origin),
        Some(Err(_)) => {
            tracing::warn!("CORS_ALLOW_ORIGIN is not a valid origin; allowing any origin");
            AllowOrigin::any()
        }
        None => AllowOrigin::any(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the application router
pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        // Health & diagnostics
        .route("/health", get(health_check))
        .route("/checkout/config", get(config_status))

        // Checkout
        .route("/checkout/create", post(create_checkout))
        .route("/checkout/session", post(create_session))
        .route("/checkout/intent", post(create_intent))

        // Verification
        .route("/checkout/verify", post(verify_payment))
        .route("/checkout/finalize", post(finalize_payment))
        .route("/webhook/stripe", post(stripe_webhook))

        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
