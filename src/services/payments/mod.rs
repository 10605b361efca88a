pub mod paylink;
pub mod stripe;

use async_trait::async_trait;
use serde::Serialize;

/// What a provider needs to collect the online part of a booking.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub booking_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub description: String,
    pub customer_email: String,
    pub success_url: String,
    pub cancel_url: String,
    pub callback_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutLink {
    /// Provider-side reference (checkout session id or payment link id).
    pub id: String,
    pub url: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout(&self, request: &CheckoutRequest) -> anyhow::Result<CheckoutLink>;
}
