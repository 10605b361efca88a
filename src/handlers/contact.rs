use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::AdminEvent;
use crate::services::booking::validate_email;
use crate::services::notifications;
use crate::state::AppState;

const MAX_MESSAGE_LEN: usize = 5000;

// POST /api/contact
#[derive(Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
}

pub async fn submit_contact(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ContactRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let name = body.name.trim();
    let email = body.email.trim();
    let phone = body.phone.as_deref().map(str::trim).filter(|p| !p.is_empty());
    let message = body.message.trim();

    if name.is_empty() || message.is_empty() {
        return Err(AppError::Validation("name and message are required".to_string()));
    }
    if message.len() > MAX_MESSAGE_LEN {
        return Err(AppError::Validation(format!(
            "message must be at most {MAX_MESSAGE_LEN} characters"
        )));
    }
    validate_email(email)?;

    let id = {
        let db = state.db()?;
        queries::insert_message(&db, name, email, phone, message)?
    };

    tracing::info!(message_id = id, "contact message received");

    let (subject, text) = notifications::shop_contact_message(name, email, phone, message);
    notifications::notify_shop(&state, &subject, &text).await;

    state.publish(AdminEvent::message(id, format!("message from {name}")));

    Ok(Json(serde_json::json!({ "ok": true, "id": id })))
}
