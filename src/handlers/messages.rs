use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::admin::check_auth;
use crate::models::{Message, MessageStatus};
use crate::state::AppState;

// GET /api/admin/messages
#[derive(Deserialize)]
pub struct MessagesQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<Message>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let status_filter = match query.status.as_deref() {
        Some(s) => Some(
            MessageStatus::parse(s)
                .ok_or_else(|| AppError::Validation(format!("unknown status: {s}")))?,
        ),
        None => None,
    };
    let limit = query.limit.unwrap_or(100).clamp(1, 500);

    let messages = {
        let db = state.db()?;
        queries::list_messages(&db, status_filter, limit)?
    };

    Ok(Json(messages))
}

// POST /api/admin/messages/:id/status
#[derive(Deserialize)]
pub struct MessageStatusRequest {
    pub status: MessageStatus,
}

pub async fn set_message_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<MessageStatusRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let updated = {
        let db = state.db()?;
        queries::update_message_status(&db, id, body.status)?
    };
    if !updated {
        return Err(AppError::NotFound("message not found".to_string()));
    }

    Ok(Json(serde_json::json!({"ok": true, "status": body.status.as_str()})))
}

// DELETE /api/admin/messages/:id
pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let deleted = {
        let db = state.db()?;
        queries::delete_message(&db, id)?
    };
    if !deleted {
        return Err(AppError::NotFound("message not found".to_string()));
    }

    tracing::info!(message_id = id, "message deleted");
    Ok(Json(serde_json::json!({"ok": true})))
}
