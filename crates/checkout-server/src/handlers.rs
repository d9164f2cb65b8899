//! HTTP Handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use checkout_core::{CheckoutError, CheckoutRequest, StartedCheckout, Verification};

use crate::config::ConfigPresence;
use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub checkout_configured: bool,
    pub verification_configured: bool,
    pub webhooks_configured: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,

    /// Polling again may succeed (provider or store hiccup)
    pub retryable: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutResponse {
    pub session_id: String,
    pub form_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: String,
    pub form_id: String,
    pub redirect_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentResponse {
    pub client_secret: String,
    pub payment_intent_id: String,
    pub form_id: String,
}

/// Payment confirmed; `warning` is set when the record was not updated
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaidResponse {
    pub success: bool,
    pub form_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingResponse {
    pub success: bool,
    pub status: &'static str,
    pub provider_status: String,
    pub provider_payment_status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
    #[serde(default)]
    pub form_id: Option<String>,
    #[serde(default)]
    pub payment_intent_id: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        checkout_configured: state.checkout.is_some(),
        verification_configured: state.verifier.is_some(),
        webhooks_configured: state.webhooks.is_some(),
    })
}

/// Configuration presence flags
pub async fn config_status(State(state): State<AppState>) -> Json<ConfigPresence> {
    Json(state.presence)
}

/// Create a hosted checkout session (client-side redirect)
pub async fn create_checkout(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CreateCheckoutResponse>, ApiError> {
    let started = start_session(&state, &headers, payload).await?;

    Ok(Json(CreateCheckoutResponse {
        session_id: started.session_id,
        form_id: started.form_id,
    }))
}

/// Create a hosted checkout session (server-side redirect)
pub async fn create_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, ApiError> {
    let started = start_session(&state, &headers, payload).await?;

    Ok(Json(SessionResponse {
        session_id: started.session_id,
        form_id: started.form_id,
        redirect_url: started.redirect_url,
    }))
}

async fn start_session(
    state: &AppState,
    headers: &HeaderMap,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<StartedCheckout, ApiError> {
    let checkout = required(&state.checkout, "Payment provider")?;
    let request = body(payload)?;

    let origin = request_origin(headers, state.site_url.as_deref()).ok_or_else(|| {
        api_error(&CheckoutError::InvalidInput(
            "Cannot determine the site origin for return URLs".into(),
        ))
    })?;

    checkout
        .start_session(request, &origin)
        .await
        .map_err(|e| api_error(&e))
}

/// Create a PaymentIntent for the embedded payment form
pub async fn create_intent(
    State(state): State<AppState>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<IntentResponse>, ApiError> {
    let checkout = required(&state.checkout, "Payment provider")?;
    let request = body(payload)?;

    let started = checkout
        .start_payment_intent(request)
        .await
        .map_err(|e| api_error(&e))?;

    Ok(Json(IntentResponse {
        client_secret: started.client_secret,
        payment_intent_id: started.payment_intent_id,
        form_id: started.form_id,
    }))
}

/// Verify a hosted checkout session and record the payment
pub async fn verify_payment(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let verifier = required(&state.verifier, "Payment verification")?;
    let request = body(payload)?;

    let verification = verifier
        .verify_session(request.session_id.as_deref().unwrap_or_default())
        .await
        .map_err(|e| api_error(&e))?;

    let response = match verification {
        Verification::Pending {
            provider_status,
            provider_payment_status,
        } => Json(PendingResponse {
            success: false,
            status: "pending_confirmation",
            provider_status,
            provider_payment_status,
        })
        .into_response(),
        paid => Json(paid_response(&paid)).into_response(),
    };

    Ok(response)
}

/// Verify an embedded PaymentIntent and record the payment
pub async fn finalize_payment(
    State(state): State<AppState>,
    payload: Result<Json<FinalizeRequest>, JsonRejection>,
) -> Result<Json<PaidResponse>, ApiError> {
    let verifier = required(&state.verifier, "Payment verification")?;
    let request = body(payload)?;

    let (Some(form_id), Some(payment_intent_id)) = (
        request.form_id.filter(|v| !v.trim().is_empty()),
        request.payment_intent_id.filter(|v| !v.trim().is_empty()),
    ) else {
        return Err(api_error(&CheckoutError::InvalidInput(
            "formId and paymentIntentId are required".into(),
        )));
    };

    let verification = verifier
        .finalize_intent(&payment_intent_id, Some(&form_id))
        .await
        .map_err(|e| api_error(&e))?;

    if let Verification::Pending {
        provider_status, ..
    } = &verification
    {
        return Err(api_error(&CheckoutError::InvalidInput(format!(
            "Payment not completed (status: {provider_status})"
        ))));
    }

    Ok(Json(paid_response(&verification)))
}

/// Stripe webhook handler
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode, ApiError> {
    let webhooks = required(&state.webhooks, "Stripe webhook")?;

    let signature = header(&headers, "stripe-signature").ok_or_else(|| {
        api_error(&CheckoutError::WebhookSignature(
            "missing Stripe-Signature header".into(),
        ))
    })?;

    let event = webhooks
        .parse_event(&body, signature)
        .map_err(|e| api_error(&e))?;

    if let Some(verification) = webhooks.handle(event).await.map_err(|e| api_error(&e))? {
        tracing::info!(state = verification.state(), "Webhook reconciled");
    }

    Ok(StatusCode::OK)
}

// ============================================================================
// Helpers
// ============================================================================

fn paid_response(verification: &Verification) -> PaidResponse {
    PaidResponse {
        success: true,
        form_id: verification.form_id().map(str::to_string),
        warning: verification.warning(),
    }
}

/// Map an error onto status, code and a client-safe body
fn api_error(err: &CheckoutError) -> ApiError {
    let (status, code) = match err {
        CheckoutError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
        CheckoutError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        CheckoutError::Gateway(_) | CheckoutError::Timeout { .. } => {
            (StatusCode::BAD_GATEWAY, "GATEWAY_ERROR")
        }
        CheckoutError::WebhookSignature(_) => (StatusCode::BAD_REQUEST, "INVALID_SIGNATURE"),
        CheckoutError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
        CheckoutError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR"),
    };

    if err.is_client_error() {
        tracing::debug!(error = %err, code, "Request rejected");
    } else {
        tracing::error!(error = %err, code, "Request failed");
    }

    (
        status,
        Json(ErrorResponse {
            success: false,
            error: err.user_message(),
            code: code.into(),
            retryable: err.is_retryable(),
        }),
    )
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| api_error(&CheckoutError::InvalidInput(rejection.body_text())))
}

fn required<'a, T>(service: &'a Option<Arc<T>>, name: &str) -> Result<&'a T, ApiError> {
    service
        .as_deref()
        .ok_or_else(|| api_error(&CheckoutError::Config(format!("{name} not configured"))))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "null")
}

/// Origin the visitor came from
///
/// `Origin`, then `Referer`, then the configured site, then the forwarded
/// host as a last resort.
fn request_origin(headers: &HeaderMap, site_url: Option<&str>) -> Option<String> {
    if let Some(origin) = header(headers, "origin") {
        return Some(origin.to_string());
    }

    if let Some(origin) = header(headers, "referer").and_then(origin_of) {
        return Some(origin);
    }

    if let Some(site) = site_url {
        return Some(site.to_string());
    }

    let host = header(headers, "x-forwarded-host").or_else(|| header(headers, "host"))?;
    let proto = header(headers, "x-forwarded-proto").unwrap_or("https");
    Some(format!("{proto}://{host}"))
}

fn origin_of(url: &str) -> Option<String> {
    let (scheme, rest) = url.split_once("://")?;
    let host = rest.split(['/', '?', '#']).next().filter(|h| !h.is_empty())?;
    Some(format!("{scheme}://{host}"))
}
