use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;

use super::EmailProvider;

/// Transactional email over a Resend-compatible JSON API.
pub struct ResendEmailProvider {
    api_url: String,
    api_key: String,
    from: String,
    client: reqwest::Client,
}

impl ResendEmailProvider {
    pub fn new(api_url: String, api_key: String, from: String) -> Self {
        Self {
            api_url,
            api_key,
            from,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

#[async_trait]
impl EmailProvider for ResendEmailProvider {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        let request = SendEmailRequest {
            from: &self.from,
            to: [to],
            subject,
            text: body,
        };

        self.client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("failed to send email")?
            .error_for_status()
            .context("email API returned error")?;

        tracing::debug!(to = %to, subject = %subject, "email sent");
        Ok(())
    }
}
