use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::{AdminEvent, PaymentProvider};
use crate::services::email::EmailProvider;
use crate::services::payments::PaymentGateway;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub email: Box<dyn EmailProvider>,
    pub stripe: Box<dyn PaymentGateway>,
    pub paylink: Box<dyn PaymentGateway>,
    pub events_tx: broadcast::Sender<AdminEvent>,
}

impl AppState {
    pub fn db(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.db
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("database lock poisoned")))
    }

    pub fn gateway(&self, provider: PaymentProvider) -> Option<&dyn PaymentGateway> {
        match provider {
            PaymentProvider::Stripe => Some(self.stripe.as_ref()),
            PaymentProvider::Paylink => Some(self.paylink.as_ref()),
            PaymentProvider::Manual => None,
        }
    }

    /// Pushes an event to live admin subscribers; dropped when nobody listens.
    pub fn publish(&self, event: AdminEvent) {
        let _ = self.events_tx.send(event);
    }
}
