//! Billing webhook handler
//!
//! The signature is verified against the shared secret before the payload
//! is parsed at all; a failed check is a 400 with no further processing.
//! Recognized events update the persisted subscription state; everything
//! else is logged and acknowledged so the provider stops retrying.

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::AppState;
use studyhall_common::{
    billing::{parse_webhook_event, verify_webhook_signature, WebhookEvent},
    errors::{AppError, Result},
    metrics,
};

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>> {
    let secret = state
        .config
        .billing
        .webhook_secret
        .as_deref()
        .ok_or_else(|| AppError::Configuration {
            message: "Billing webhook secret not configured".to_string(),
        })?;

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::WebhookSignature {
            message: "missing signature header".to_string(),
        })?;

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;

    verify_webhook_signature(&body, signature, secret, now)?;

    let event = parse_webhook_event(&body)?;
    let handled = dispatch_event(&state, &event).await?;
    metrics::record_billing_event(&event.event_type, handled);

    Ok(Json(WebhookAck { received: true }))
}

/// Apply a verified event to persisted state. Returns whether the event
/// type was recognized.
async fn dispatch_event(state: &AppState, event: &WebhookEvent) -> Result<bool> {
    let object = &event.data.object;

    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let Some(user_id) = object
                .pointer("/metadata/user_id")
                .and_then(|v| v.as_str())
                .and_then(|s| Uuid::parse_str(s).ok())
            else {
                tracing::error!("checkout.session.completed without usable user_id metadata");
                return Ok(true);
            };

            let Some(customer) = object.get("customer").and_then(|v| v.as_str()) else {
                tracing::error!("checkout.session.completed without customer id");
                return Ok(true);
            };

            let subscription = object.get("subscription").and_then(|v| v.as_str());

            state
                .repo
                .set_profile_billing(user_id, customer, subscription, "active")
                .await?;

            tracing::info!(user_id = %user_id, "Checkout completed, billing ids persisted");
            Ok(true)
        }

        "customer.subscription.updated" | "customer.subscription.deleted" => {
            let Some(customer) = object.get("customer").and_then(|v| v.as_str()) else {
                tracing::error!(event = %event.event_type, "subscription event without customer id");
                return Ok(true);
            };

            let subscription_id = object.get("id").and_then(|v| v.as_str());
            let status = if event.event_type.ends_with("deleted") {
                "canceled"
            } else {
                object
                    .get("status")
                    .and_then(|v| v.as_str())
                    .unwrap_or("active")
            };
            let cancel_at_period_end = object
                .get("cancel_at_period_end")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);

            let updated = state
                .repo
                .update_subscription_by_customer(customer, subscription_id, status, cancel_at_period_end)
                .await?;

            if updated.is_none() {
                tracing::warn!(customer, "Subscription event for unknown customer");
            }
            Ok(true)
        }

        "invoice.payment_failed" => {
            let Some(customer) = object.get("customer").and_then(|v| v.as_str()) else {
                tracing::error!("invoice.payment_failed without customer id");
                return Ok(true);
            };

            state
                .repo
                .update_subscription_by_customer(customer, None, "past_due", false)
                .await?;

            tracing::warn!(customer, "Payment failed, subscription marked past_due");
            Ok(true)
        }

        other => {
            tracing::info!(event = other, "Ignoring unrecognized webhook event");
            Ok(false)
        }
    }
}
