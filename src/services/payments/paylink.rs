//! Regional payment-link provider.
//!
//! Links are created over a bearer-authenticated JSON API. Its webhooks are
//! not signed; instead every callback echoes a shared `secret_key` that
//! must match the configured one.

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use super::{CheckoutLink, CheckoutRequest, PaymentGateway};

pub struct PaylinkGateway {
    api_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl PaylinkGateway {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct CreateLinkRequest<'a> {
    order_id: &'a str,
    amount: i64,
    currency: &'a str,
    description: &'a str,
    customer_email: &'a str,
    return_url: &'a str,
    callback_url: &'a str,
}

#[derive(Deserialize)]
struct CreatedLink {
    id: String,
    #[serde(alias = "payment_url")]
    url: String,
}

#[async_trait]
impl PaymentGateway for PaylinkGateway {
    async fn create_checkout(&self, request: &CheckoutRequest) -> anyhow::Result<CheckoutLink> {
        anyhow::ensure!(
            !self.api_url.is_empty() && !self.api_key.is_empty(),
            "PAYLINK_API_URL and PAYLINK_API_KEY must be configured"
        );

        let body = CreateLinkRequest {
            order_id: &request.booking_id,
            amount: request.amount_cents,
            currency: &request.currency,
            description: &request.description,
            customer_email: &request.customer_email,
            return_url: &request.success_url,
            callback_url: &request.callback_url,
        };

        let response = self
            .client
            .post(format!("{}/payment-links", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("failed to reach payment link provider")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("payment link API error ({status}): {error_text}");
        }

        let link: CreatedLink = response
            .json()
            .await
            .context("failed to parse payment link response")?;

        tracing::info!(booking_id = %request.booking_id, link_id = %link.id, "created payment link");

        Ok(CheckoutLink {
            id: link.id,
            url: link.url,
        })
    }
}

// ── Webhooks ──

#[derive(Debug, Clone, Deserialize)]
pub struct PaylinkWebhook {
    pub order_id: String,
    pub transaction_id: Option<String>,
    pub status: String,
    pub amount: Option<i64>,
    #[serde(default)]
    pub secret_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaylinkOutcome {
    Paid,
    Failed,
    Expired,
    Other,
}

impl PaylinkWebhook {
    pub fn outcome(&self) -> PaylinkOutcome {
        match self.status.to_lowercase().as_str() {
            "success" | "paid" | "completed" => PaylinkOutcome::Paid,
            "failed" | "declined" | "cancelled" | "canceled" => PaylinkOutcome::Failed,
            "expired" => PaylinkOutcome::Expired,
            _ => PaylinkOutcome::Other,
        }
    }
}

/// An unconfigured secret never matches.
pub fn verify_shared_secret(expected: &str, provided: &str) -> bool {
    if expected.is_empty() {
        return false;
    }
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn webhook(status: &str) -> PaylinkWebhook {
        PaylinkWebhook {
            order_id: "bk-1".to_string(),
            transaction_id: Some("tx-1".to_string()),
            status: status.to_string(),
            amount: Some(1000),
            secret_key: "s3cret".to_string(),
        }
    }

    #[test]
    fn test_outcome_mapping() {
        assert_eq!(webhook("success").outcome(), PaylinkOutcome::Paid);
        assert_eq!(webhook("PAID").outcome(), PaylinkOutcome::Paid);
        assert_eq!(webhook("declined").outcome(), PaylinkOutcome::Failed);
        assert_eq!(webhook("expired").outcome(), PaylinkOutcome::Expired);
        assert_eq!(webhook("processing").outcome(), PaylinkOutcome::Other);
    }

    #[test]
    fn test_shared_secret() {
        assert!(verify_shared_secret("s3cret", "s3cret"));
        assert!(!verify_shared_secret("s3cret", "s3cre"));
        assert!(!verify_shared_secret("s3cret", ""));
        assert!(!verify_shared_secret("", ""));
    }

    #[test]
    fn test_webhook_payload_defaults() {
        let parsed: PaylinkWebhook =
            serde_json::from_str(r#"{"order_id":"bk-9","status":"paid"}"#).unwrap();
        assert_eq!(parsed.order_id, "bk-9");
        assert!(parsed.secret_key.is_empty());
        assert!(parsed.amount.is_none());
    }
}
