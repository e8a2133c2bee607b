//! Billing handlers
//!
//! Every operation resolves the billing customer from the authenticated
//! user's verified email. Client-supplied emails or customer ids are
//! never accepted.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::AppState;
use studyhall_common::{
    auth::AuthContext,
    billing::PlanTier,
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutRequest {
    pub price_id: String,
}

#[derive(Debug, Serialize)]
pub struct RedirectResponse {
    pub url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatusResponse {
    pub subscription: Option<SubscriptionDto>,
    pub plan: &'static str,
    pub customer_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDto {
    pub id: String,
    pub status: String,
    pub current_period_end: i64,
    pub cancel_at_period_end: bool,
}

/// Create a subscription checkout session and return its redirect URL
pub async fn create_checkout(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateCheckoutRequest>,
) -> Result<Json<RedirectResponse>> {
    let identity = auth.require_identity()?;

    // Only prices from the static table are purchasable
    let table = state.billing.price_table();
    if table.tier_for_price(&request.price_id) == PlanTier::Free {
        return Err(AppError::Validation {
            message: format!("unknown price identifier {}", request.price_id),
            field: Some("priceId".into()),
        });
    }

    let customer = state
        .billing
        .find_customer_by_email(&identity.email)
        .await?;

    let url = state
        .billing
        .create_checkout_session(
            customer.as_ref(),
            &identity.email,
            &request.price_id,
            &identity.user_id.to_string(),
        )
        .await?;

    tracing::info!(user_id = %identity.user_id, "Checkout session created");

    Ok(Json(RedirectResponse { url }))
}

/// Open the billing-management portal for an existing customer
pub async fn customer_portal(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<RedirectResponse>> {
    let identity = auth.require_identity()?;

    let customer = state
        .billing
        .find_customer_by_email(&identity.email)
        .await?
        .ok_or(AppError::CustomerNotFound)?;

    let url = state.billing.create_portal_session(&customer.id).await?;

    Ok(Json(RedirectResponse { url }))
}

/// Report the caller's current plan tier and subscription state
pub async fn subscription_status(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<SubscriptionStatusResponse>> {
    let identity = auth.require_identity()?;

    let Some(customer) = state
        .billing
        .find_customer_by_email(&identity.email)
        .await?
    else {
        return Ok(Json(SubscriptionStatusResponse {
            subscription: None,
            plan: PlanTier::Free.as_str(),
            customer_id: None,
        }));
    };

    let Some(subscription) = state.billing.active_subscription(&customer.id).await? else {
        return Ok(Json(SubscriptionStatusResponse {
            subscription: None,
            plan: PlanTier::Free.as_str(),
            customer_id: Some(customer.id),
        }));
    };

    let plan = subscription
        .price_id
        .as_deref()
        .map(|price_id| state.billing.price_table().tier_for_price(price_id))
        .unwrap_or(PlanTier::Free);

    Ok(Json(SubscriptionStatusResponse {
        subscription: Some(SubscriptionDto {
            id: subscription.id,
            status: subscription.status,
            current_period_end: subscription.current_period_end,
            cancel_at_period_end: subscription.cancel_at_period_end,
        }),
        plan: plan.as_str(),
        customer_id: Some(customer.id),
    }))
}
