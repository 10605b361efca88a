use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::admin::check_auth;
use crate::models::Motorcycle;
use crate::state::AppState;

#[derive(Serialize)]
pub struct FleetEntry {
    #[serde(flatten)]
    motorcycle: Motorcycle,
    currently_booked: bool,
}

// GET /api/admin/motorcycles
pub async fn list_motorcycles(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<FleetEntry>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let today = chrono::Utc::now().date_naive();
    let (motorcycles, out_today) = {
        let db = state.db()?;
        (
            queries::list_motorcycles(&db)?,
            queries::motorcycles_out_on(&db, today)?,
        )
    };

    let entries = motorcycles
        .into_iter()
        .map(|motorcycle| FleetEntry {
            currently_booked: out_today.contains(&motorcycle.id),
            motorcycle,
        })
        .collect();

    Ok(Json(entries))
}

// POST /api/admin/motorcycles
#[derive(Deserialize)]
pub struct CreateMotorcycleRequest {
    pub name: String,
    pub is_available: Option<bool>,
}

pub async fn create_motorcycle(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateMotorcycleRequest>,
) -> Result<Json<Motorcycle>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }

    let motorcycle = {
        let db = state.db()?;
        let id = queries::insert_motorcycle(&db, name, body.is_available.unwrap_or(true))?;
        queries::get_motorcycle(&db, id)?
            .ok_or_else(|| AppError::NotFound("motorcycle not found".to_string()))?
    };

    tracing::info!(motorcycle_id = motorcycle.id, name = %motorcycle.name, "motorcycle added");
    Ok(Json(motorcycle))
}

// PATCH /api/admin/motorcycles/:id
#[derive(Deserialize)]
pub struct UpdateMotorcycleRequest {
    pub name: Option<String>,
    pub is_available: Option<bool>,
}

pub async fn update_motorcycle(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<UpdateMotorcycleRequest>,
) -> Result<Json<Motorcycle>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let motorcycle = {
        let db = state.db()?;
        let mut motorcycle = queries::get_motorcycle(&db, id)?
            .ok_or_else(|| AppError::NotFound("motorcycle not found".to_string()))?;

        if let Some(name) = body.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(AppError::Validation("name must not be empty".to_string()));
            }
            motorcycle.name = name;
        }
        if let Some(is_available) = body.is_available {
            motorcycle.is_available = is_available;
        }

        queries::update_motorcycle(&db, id, &motorcycle.name, motorcycle.is_available)?;
        motorcycle
    };

    tracing::info!(
        motorcycle_id = id,
        is_available = motorcycle.is_available,
        "motorcycle updated"
    );
    Ok(Json(motorcycle))
}
