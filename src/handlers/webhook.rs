use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{PaymentProvider, PaymentStatus};
use crate::services::booking::{self, ConfirmOutcome, PaymentConfirmation};
use crate::services::payments::paylink::{self, PaylinkOutcome, PaylinkWebhook};
use crate::services::payments::stripe::{self, CheckoutSessionObject, StripeEvent};
use crate::state::AppState;

fn received() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "received": true }))
}

/// Unknown bookings are acknowledged. Other errors surface so the provider
/// retries.
fn acknowledge_missing(result: Result<(), AppError>) -> Result<Json<serde_json::Value>, AppError> {
    match result {
        Ok(()) => Ok(received()),
        Err(AppError::NotFound(what)) => {
            tracing::warn!(missing = %what, "webhook references unknown booking");
            Ok(received())
        }
        Err(e) => Err(e),
    }
}

// POST /webhook/stripe
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let secret = &state.config.stripe_webhook_secret;
    if secret.is_empty() {
        tracing::error!("STRIPE_WEBHOOK_SECRET not configured, rejecting webhook");
        return Err(AppError::InvalidWebhook("webhook secret not configured".to_string()));
    }

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if let Err(e) = stripe::verify_signature(secret, &body, signature, chrono::Utc::now().timestamp()) {
        tracing::warn!(error = %e, "rejected Stripe webhook");
        return Err(AppError::InvalidWebhook(e.to_string()));
    }

    let event: StripeEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidWebhook(format!("invalid JSON: {e}")))?;

    tracing::info!(event_id = %event.id, event_type = %event.event_type, "Stripe webhook received");

    let session = match event.event_type.as_str() {
        "checkout.session.completed"
        | "checkout.session.async_payment_succeeded"
        | "checkout.session.expired"
        | "checkout.session.async_payment_failed" => {
            serde_json::from_value::<CheckoutSessionObject>(event.data.object)
                .map_err(|e| AppError::InvalidWebhook(format!("invalid checkout session: {e}")))?
        }
        other => {
            tracing::debug!(event_type = %other, "ignoring Stripe event");
            return Ok(received());
        }
    };

    let booking_id = match session.booking_id() {
        Some(id) => id.to_string(),
        None => {
            let found = {
                let db = state.db()?;
                queries::get_booking_by_stripe_session(&db, &session.id)?
            };
            match found {
                Some(booking) => booking.id,
                None => {
                    tracing::warn!(session_id = %session.id, "checkout session without booking reference");
                    return Ok(received());
                }
            }
        }
    };

    let result = match event.event_type.as_str() {
        "checkout.session.completed" | "checkout.session.async_payment_succeeded" => {
            if session.payment_status.as_deref() != Some("paid") {
                tracing::info!(
                    booking_id = %booking_id,
                    payment_status = ?session.payment_status,
                    "checkout completed without payment yet, waiting"
                );
                return Ok(received());
            }
            let confirmation = PaymentConfirmation {
                provider: PaymentProvider::Stripe,
                reference: session.payment_intent.clone(),
                amount_cents: session.amount_total,
            };
            booking::confirm_payment(&state, &booking_id, confirmation)
                .await
                .map(log_outcome)
        }
        "checkout.session.expired" => {
            booking::fail_payment(&state, &booking_id, PaymentStatus::Expired).map(|_| ())
        }
        _ => booking::fail_payment(&state, &booking_id, PaymentStatus::Failed).map(|_| ()),
    };

    acknowledge_missing(result)
}

// POST /webhook/paylink
pub async fn paylink_webhook(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PaylinkWebhook>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !paylink::verify_shared_secret(&state.config.paylink_webhook_secret, &payload.secret_key) {
        tracing::warn!(order_id = %payload.order_id, "invalid payment link webhook secret");
        return Err(AppError::Forbidden);
    }

    tracing::info!(
        order_id = %payload.order_id,
        status = %payload.status,
        "payment link webhook received"
    );

    let result = match payload.outcome() {
        PaylinkOutcome::Paid => {
            let confirmation = PaymentConfirmation {
                provider: PaymentProvider::Paylink,
                reference: payload.transaction_id.clone(),
                amount_cents: payload.amount,
            };
            booking::confirm_payment(&state, &payload.order_id, confirmation)
                .await
                .map(log_outcome)
        }
        PaylinkOutcome::Failed => {
            booking::fail_payment(&state, &payload.order_id, PaymentStatus::Failed).map(|_| ())
        }
        PaylinkOutcome::Expired => {
            booking::fail_payment(&state, &payload.order_id, PaymentStatus::Expired).map(|_| ())
        }
        PaylinkOutcome::Other => {
            tracing::debug!(status = %payload.status, "ignoring payment link status");
            Ok(())
        }
    };

    acknowledge_missing(result)
}

fn log_outcome(outcome: ConfirmOutcome) {
    match outcome {
        ConfirmOutcome::Confirmed {
            booking,
            motorcycles,
        } => {
            tracing::info!(
                booking_id = %booking.id,
                assigned = motorcycles.len(),
                "booking confirmed by webhook"
            );
        }
        ConfirmOutcome::AlreadyProcessed | ConfirmOutcome::WrongProvider => {}
    }
}
