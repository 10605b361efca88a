use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::db::queries;
use crate::services::calendar::generate_ics;
use crate::state::AppState;

pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Response {
    // Strip .ics suffix if present
    let booking_id = raw_id.strip_suffix(".ics").unwrap_or(&raw_id);

    let loaded = match state.db() {
        Ok(db) => queries::get_booking_by_id(&db, booking_id).and_then(|booking| match booking {
            Some(b) => {
                let bikes = queries::get_assigned_motorcycles(&db, booking_id)?;
                Ok(Some((b, bikes)))
            }
            None => Ok(None),
        }),
        Err(e) => Err(anyhow::anyhow!(e.to_string())),
    };

    let (booking, motorcycles) = match loaded {
        Ok(Some((b, bikes))) if b.status.is_active() => (b, bikes),
        Ok(_) => return (StatusCode::NOT_FOUND, "Booking not found").into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to load booking for .ics");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response();
        }
    };

    let ics = generate_ics(&booking, &motorcycles);
    let filename = format!("booking-{}.ics", booking.id);

    (
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        ics,
    )
        .into_response()
}
