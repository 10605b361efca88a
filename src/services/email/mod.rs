pub mod resend;

use async_trait::async_trait;

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Used when no email API key is configured: logs instead of sending.
pub struct LogOnlyEmailProvider;

#[async_trait]
impl EmailProvider for LogOnlyEmailProvider {
    async fn send_email(&self, to: &str, subject: &str, _body: &str) -> anyhow::Result<()> {
        tracing::info!(to = %to, subject = %subject, "email provider not configured, skipping send");
        Ok(())
    }
}
