use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use motorent::config::AppConfig;
use motorent::db;
use motorent::routes;
use motorent::services::email::resend::ResendEmailProvider;
use motorent::services::email::{EmailProvider, LogOnlyEmailProvider};
use motorent::services::payments::paylink::PaylinkGateway;
use motorent::services::payments::stripe::StripeGateway;
use motorent::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let email: Box<dyn EmailProvider> = if config.email_api_key.is_empty() {
        tracing::warn!("EMAIL_API_KEY not set, emails will only be logged");
        Box::new(LogOnlyEmailProvider)
    } else {
        tracing::info!("sending email via {}", config.email_api_url);
        Box::new(ResendEmailProvider::new(
            config.email_api_url.clone(),
            config.email_api_key.clone(),
            config.email_from.clone(),
        ))
    };

    if config.stripe_secret_key.is_empty() {
        tracing::warn!("STRIPE_SECRET_KEY not set, Stripe checkouts will fail");
    }
    if config.stripe_webhook_secret.is_empty() {
        tracing::warn!("STRIPE_WEBHOOK_SECRET not set, Stripe webhooks will be rejected");
    }
    if config.paylink_api_url.is_empty() {
        tracing::warn!("PAYLINK_API_URL not set, payment link checkouts will fail");
    }
    if config.admin_token == "changeme" {
        tracing::warn!("ADMIN_TOKEN is the default value, set a real token in production");
    }

    let stripe = StripeGateway::new(
        config.stripe_api_base.clone(),
        config.stripe_secret_key.clone(),
    );
    let paylink = PaylinkGateway::new(
        config.paylink_api_url.clone(),
        config.paylink_api_key.clone(),
    );

    let (events_tx, _) = broadcast::channel(256);

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        email,
        stripe: Box::new(stripe),
        paylink: Box::new(paylink),
        events_tx,
    });

    let app = routes::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
