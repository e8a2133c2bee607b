//! Billing provider adapter
//!
//! Thin pass-through to the subscription billing API. Customers are always
//! resolved by the authenticated user's verified email; client-supplied
//! emails or ids are never trusted for billing operations. Webhook payloads
//! are only parsed after their signature checks out.

use crate::config::BillingConfig;
use crate::errors::{AppError, Result};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Accepted clock skew between the webhook timestamp and now
pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

/// Subscription level derived from the active price identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Essential,
    Pro,
    Ultimate,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Essential => "essential",
            PlanTier::Pro => "pro",
            PlanTier::Ultimate => "ultimate",
        }
    }
}

/// Static price -> tier table built from configuration
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    essential: Option<String>,
    pro: Option<String>,
    ultimate: Option<String>,
}

impl PriceTable {
    pub fn from_config(config: &BillingConfig) -> Self {
        Self {
            essential: config.price_essential.clone(),
            pro: config.price_pro.clone(),
            ultimate: config.price_ultimate.clone(),
        }
    }

    /// Tier for a subscribed price; unknown prices report free and are
    /// logged for operator follow-up
    pub fn tier_for_price(&self, price_id: &str) -> PlanTier {
        if self.essential.as_deref() == Some(price_id) {
            PlanTier::Essential
        } else if self.pro.as_deref() == Some(price_id) {
            PlanTier::Pro
        } else if self.ultimate.as_deref() == Some(price_id) {
            PlanTier::Ultimate
        } else {
            tracing::warn!(price_id, "Unmapped price identifier, reporting free tier");
            PlanTier::Free
        }
    }

    /// Price identifier for a paid tier, if configured
    pub fn price_for_tier(&self, tier: PlanTier) -> Option<&str> {
        match tier {
            PlanTier::Free => None,
            PlanTier::Essential => self.essential.as_deref(),
            PlanTier::Pro => self.pro.as_deref(),
            PlanTier::Ultimate => self.ultimate.as_deref(),
        }
    }
}

// ============================================================================
// Provider objects
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BillingCustomer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SubscriptionInfo {
    pub id: String,
    pub status: String,
    pub current_period_end: i64,
    pub cancel_at_period_end: bool,
    pub price_id: Option<String>,
}

#[derive(Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

#[derive(Deserialize)]
struct SubscriptionObject {
    id: String,
    status: String,
    current_period_end: i64,
    #[serde(default)]
    cancel_at_period_end: bool,
    items: SubscriptionItems,
}

#[derive(Deserialize)]
struct SubscriptionItems {
    data: Vec<SubscriptionItem>,
}

#[derive(Deserialize)]
struct SubscriptionItem {
    price: PriceObject,
}

#[derive(Deserialize)]
struct PriceObject {
    id: String,
}

#[derive(Deserialize)]
struct SessionObject {
    url: String,
}

// ============================================================================
// Client
// ============================================================================

/// Form-encoded REST client for the billing provider
pub struct BillingClient {
    client: reqwest::Client,
    config: BillingConfig,
}

impl BillingClient {
    pub fn new(config: BillingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    pub fn price_table(&self) -> PriceTable {
        PriceTable::from_config(&self.config)
    }

    fn secret_key(&self) -> Result<&str> {
        self.config.secret_key.as_deref().ok_or_else(|| AppError::Configuration {
            message: "Billing secret key not configured".to_string(),
        })
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<reqwest::Response> {
        let url = format!("{}/{}", self.config.api_base, path);
        let response = self
            .client
            .get(&url)
            .bearer_auth(self.secret_key()?)
            .query(query)
            .send()
            .await?;
        Self::check(response).await
    }

    async fn post_form(&self, path: &str, form: &[(String, String)]) -> Result<reqwest::Response> {
        let url = format!("{}/{}", self.config.api_base, path);
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.secret_key()?)
            .form(form)
            .send()
            .await?;
        Self::check(response).await
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::Billing {
            message: format!("provider status {}: {}", status, body),
        })
    }

    /// Look up an existing customer by verified email
    pub async fn find_customer_by_email(&self, email: &str) -> Result<Option<BillingCustomer>> {
        let response = self
            .get("customers", &[("email", email), ("limit", "1")])
            .await?;
        let list: ListResponse<BillingCustomer> = response.json().await?;
        Ok(list.data.into_iter().next())
    }

    /// Create a subscription-mode checkout session and return its redirect
    /// URL. The user id travels in session metadata so the webhook can
    /// attribute the completed checkout.
    pub async fn create_checkout_session(
        &self,
        customer: Option<&BillingCustomer>,
        email: &str,
        price_id: &str,
        user_id: &str,
    ) -> Result<String> {
        let mut form: Vec<(String, String)> = vec![
            ("mode".into(), "subscription".into()),
            ("line_items[0][price]".into(), price_id.into()),
            ("line_items[0][quantity]".into(), "1".into()),
            ("success_url".into(), self.config.checkout_success_url.clone()),
            ("cancel_url".into(), self.config.checkout_cancel_url.clone()),
            ("metadata[user_id]".into(), user_id.into()),
        ];

        match customer {
            Some(customer) => form.push(("customer".into(), customer.id.clone())),
            None => form.push(("customer_email".into(), email.into())),
        }

        let response = self.post_form("checkout/sessions", &form).await?;
        let session: SessionObject = response.json().await?;
        Ok(session.url)
    }

    /// Open a billing-management portal session for an existing customer
    pub async fn create_portal_session(&self, customer_id: &str) -> Result<String> {
        let form: Vec<(String, String)> = vec![
            ("customer".into(), customer_id.into()),
            ("return_url".into(), self.config.portal_return_url.clone()),
        ];

        let response = self.post_form("billing_portal/sessions", &form).await?;
        let session: SessionObject = response.json().await?;
        Ok(session.url)
    }

    /// The customer's active subscription, if any
    pub async fn active_subscription(&self, customer_id: &str) -> Result<Option<SubscriptionInfo>> {
        let response = self
            .get(
                "subscriptions",
                &[("customer", customer_id), ("status", "active"), ("limit", "1")],
            )
            .await?;

        let list: ListResponse<SubscriptionObject> = response.json().await?;
        Ok(list.data.into_iter().next().map(|sub| SubscriptionInfo {
            price_id: sub.items.data.first().map(|item| item.price.id.clone()),
            id: sub.id,
            status: sub.status,
            current_period_end: sub.current_period_end,
            cancel_at_period_end: sub.cancel_at_period_end,
        }))
    }
}

// ============================================================================
// Webhook verification
// ============================================================================

/// A provider webhook event, parsed only after signature verification
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookData {
    pub object: serde_json::Value,
}

/// Verify the `t=...,v1=...` signature header against the shared secret.
/// The signed message is `"{t}.{payload}"`; the timestamp must be within
/// the tolerance window to defeat replay.
pub fn verify_webhook_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    now_unix: i64,
) -> Result<()> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = value.parse().ok();
            }
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| AppError::WebhookSignature {
        message: "missing timestamp".to_string(),
    })?;
    if candidates.is_empty() {
        return Err(AppError::WebhookSignature {
            message: "missing v1 signature".to_string(),
        });
    }
    if (now_unix - timestamp).abs() > WEBHOOK_TOLERANCE_SECS {
        return Err(AppError::WebhookSignature {
            message: "timestamp outside tolerance".to_string(),
        });
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| {
        AppError::WebhookSignature {
            message: "invalid signing secret".to_string(),
        }
    })?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = candidates.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|decoded| mac.clone().verify_slice(&decoded).is_ok())
            .unwrap_or(false)
    });

    if matched {
        Ok(())
    } else {
        Err(AppError::WebhookSignature {
            message: "no matching v1 signature".to_string(),
        })
    }
}

/// Parse a verified payload into an event
pub fn parse_webhook_event(payload: &[u8]) -> Result<WebhookEvent> {
    serde_json::from_slice(payload).map_err(|e| AppError::WebhookSignature {
        message: format!("unparseable event payload: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PriceTable {
        PriceTable {
            essential: Some("price_ess".into()),
            pro: Some("price_pro".into()),
            ultimate: Some("price_ult".into()),
        }
    }

    fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn test_price_tier_mapping() {
        let table = table();
        assert_eq!(table.tier_for_price("price_ess"), PlanTier::Essential);
        assert_eq!(table.tier_for_price("price_pro"), PlanTier::Pro);
        assert_eq!(table.tier_for_price("price_ult"), PlanTier::Ultimate);
        assert_eq!(table.tier_for_price("price_unknown"), PlanTier::Free);
    }

    #[test]
    fn test_price_for_tier_round_trip() {
        let table = table();
        assert_eq!(table.price_for_tier(PlanTier::Pro), Some("price_pro"));
        assert_eq!(table.price_for_tier(PlanTier::Free), None);
    }

    #[test]
    fn test_valid_signature_accepted() {
        let payload = br#"{"type": "checkout.session.completed"}"#;
        let header = sign(payload, "whsec_test", 1_700_000_000);

        assert!(verify_webhook_signature(payload, &header, "whsec_test", 1_700_000_010).is_ok());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let payload = br#"{"type": "checkout.session.completed"}"#;
        let header = sign(payload, "whsec_test", 1_700_000_000);

        let tampered = br#"{"type": "customer.subscription.deleted"}"#;
        assert!(matches!(
            verify_webhook_signature(tampered, &header, "whsec_test", 1_700_000_010),
            Err(AppError::WebhookSignature { .. })
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let payload = br#"{}"#;
        let header = sign(payload, "whsec_a", 1_700_000_000);

        assert!(verify_webhook_signature(payload, &header, "whsec_b", 1_700_000_010).is_err());
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let payload = br#"{}"#;
        let header = sign(payload, "whsec_test", 1_700_000_000);

        let later = 1_700_000_000 + WEBHOOK_TOLERANCE_SECS + 1;
        assert!(verify_webhook_signature(payload, &header, "whsec_test", later).is_err());
    }

    #[test]
    fn test_garbage_header_rejected() {
        assert!(verify_webhook_signature(b"{}", "nonsense", "whsec_test", 0).is_err());
        assert!(verify_webhook_signature(b"{}", "t=abc,v1=zz", "whsec_test", 0).is_err());
    }

    #[test]
    fn test_event_parsing() {
        let payload = br#"{
            "type": "invoice.payment_failed",
            "data": { "object": { "customer": "cus_123" } }
        }"#;
        let event = parse_webhook_event(payload).unwrap();
        assert_eq!(event.event_type, "invoice.payment_failed");
        assert_eq!(event.data.object["customer"], "cus_123");
    }
}
