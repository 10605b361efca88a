//! Card checkout through Stripe Checkout Sessions.
//!
//! Webhooks are verified with the `Stripe-Signature` header: an HMAC-SHA256
//! over `"{timestamp}.{raw body}"` keyed by the endpoint secret, compared in
//! constant time, with a bounded timestamp window against replays.

use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::{CheckoutLink, CheckoutRequest, PaymentGateway};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age for webhook events (5 minutes).
const MAX_TIMESTAMP_AGE_SECS: i64 = 300;

/// Clock skew tolerance for future timestamps.
const MAX_FUTURE_TOLERANCE_SECS: i64 = 60;

pub struct StripeGateway {
    api_base: String,
    secret_key: String,
    client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(api_base: String, secret_key: String) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct CreatedSession {
    id: String,
    url: Option<String>,
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout(&self, request: &CheckoutRequest) -> anyhow::Result<CheckoutLink> {
        anyhow::ensure!(!self.secret_key.is_empty(), "STRIPE_SECRET_KEY is not configured");

        let url = format!("{}/v1/checkout/sessions", self.api_base);
        let params = [
            ("mode", "payment".to_string()),
            ("customer_email", request.customer_email.clone()),
            ("client_reference_id", request.booking_id.clone()),
            ("metadata[booking_id]", request.booking_id.clone()),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", request.currency.clone()),
            ("line_items[0][price_data][unit_amount]", request.amount_cents.to_string()),
            ("line_items[0][price_data][product_data][name]", request.description.clone()),
            ("success_url", request.success_url.clone()),
            ("cancel_url", request.cancel_url.clone()),
        ];

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await
            .context("failed to reach Stripe")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Stripe API error ({status}): {error_text}");
        }

        let session: CreatedSession = response
            .json()
            .await
            .context("failed to parse Stripe checkout session")?;

        let url = session
            .url
            .unwrap_or_else(|| format!("https://checkout.stripe.com/c/pay/{}", session.id));

        tracing::info!(booking_id = %request.booking_id, session_id = %session.id, "created Stripe checkout session");

        Ok(CheckoutLink { id: session.id, url })
    }
}

// ── Webhooks ──

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("missing Stripe-Signature header")]
    MissingHeader,
    #[error("malformed Stripe-Signature header")]
    Malformed,
    #[error("event too old ({0} seconds)")]
    TooOld(i64),
    #[error("event timestamp in the future")]
    FromFuture,
    #[error("signature mismatch")]
    Mismatch,
}

/// Parsed `t=<unix>,v1=<hex>[,v1=<hex>..]` header. Several `v1` entries
/// appear while an endpoint secret is being rolled.
#[derive(Debug)]
struct SignatureHeader {
    timestamp: i64,
    v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    fn parse(header: &str) -> Result<Self, SignatureError> {
        if header.trim().is_empty() {
            return Err(SignatureError::MissingHeader);
        }

        let mut timestamp = None;
        let mut v1_signatures = vec![];

        for part in header.split(',') {
            let (key, value) = part.split_once('=').ok_or(SignatureError::Malformed)?;
            match key.trim() {
                "t" => {
                    timestamp = Some(value.trim().parse().map_err(|_| SignatureError::Malformed)?);
                }
                "v1" => {
                    v1_signatures.push(hex_decode(value.trim()).ok_or(SignatureError::Malformed)?);
                }
                _ => {}
            }
        }

        if v1_signatures.is_empty() {
            return Err(SignatureError::Malformed);
        }

        Ok(Self {
            timestamp: timestamp.ok_or(SignatureError::Malformed)?,
            v1_signatures,
        })
    }
}

pub fn verify_signature(
    secret: &str,
    payload: &[u8],
    header: &str,
    now: i64,
) -> Result<(), SignatureError> {
    let header = SignatureHeader::parse(header)?;

    let age = now - header.timestamp;
    if age > MAX_TIMESTAMP_AGE_SECS {
        return Err(SignatureError::TooOld(age));
    }
    if age < -MAX_FUTURE_TOLERANCE_SECS {
        return Err(SignatureError::FromFuture);
    }

    let expected =
        compute_signature(secret, header.timestamp, payload).ok_or(SignatureError::Mismatch)?;
    let matched = header
        .v1_signatures
        .iter()
        .any(|candidate| expected.as_slice().ct_eq(candidate.as_slice()).into());

    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Builds a `Stripe-Signature` header value for `payload`, as Stripe would.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let signature = compute_signature(secret, timestamp, payload).unwrap_or_default();
    format!("t={timestamp},v1={}", hex_encode(&signature))
}

fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> Option<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);
    Some(mac.finalize().into_bytes().to_vec())
}

fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect()
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    pub payment_status: Option<String>,
    pub payment_intent: Option<String>,
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub amount_total: Option<i64>,
}

impl CheckoutSessionObject {
    pub fn booking_id(&self) -> Option<&str> {
        self.metadata
            .get("booking_id")
            .map(String::as_str)
            .or(self.client_reference_id.as_deref())
            .filter(|id| !id.is_empty())
    }
}
