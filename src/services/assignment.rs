use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{BookingStatus, Motorcycle};

#[derive(Debug, thiserror::Error)]
pub enum AssignmentError {
    #[error("booking not found: {0}")]
    BookingNotFound(String),

    #[error("booking is {}, only active bookings hold motorcycles", .0.as_str())]
    Inactive(BookingStatus),

    #[error("only {free} motorcycle(s) free for these dates, {requested} needed")]
    NotEnoughMotorcycles { requested: u32, free: u32 },

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<AssignmentError> for AppError {
    fn from(err: AssignmentError) -> Self {
        match err {
            AssignmentError::BookingNotFound(id) => AppError::NotFound(format!("booking {id}")),
            AssignmentError::Inactive(_) => AppError::Validation(err.to_string()),
            AssignmentError::NotEnoughMotorcycles { requested, free } => AppError::Unavailable {
                requested,
                available: free,
            },
            AssignmentError::Sqlite(e) => AppError::Database(e),
            AssignmentError::Other(e) => AppError::Internal(e),
        }
    }
}

/// Greedily gives an active booking its motorcycles, lowest id first.
///
/// Selection and insertion share one transaction, so two bookings for
/// overlapping dates can never be handed the same motorcycle. A booking
/// that already holds exactly its quantity keeps its current bikes; any
/// other existing assignment is replaced.
pub fn assign_motorcycles(
    conn: &mut Connection,
    booking_id: &str,
) -> Result<Vec<Motorcycle>, AssignmentError> {
    let tx = conn.transaction()?;

    let booking = queries::get_booking_by_id(&tx, booking_id)?
        .ok_or_else(|| AssignmentError::BookingNotFound(booking_id.to_string()))?;

    if !booking.status.is_active() {
        return Err(AssignmentError::Inactive(booking.status));
    }

    let existing = queries::get_assigned_motorcycles(&tx, booking_id)?;
    if existing.len() == booking.bike_quantity as usize {
        return Ok(existing);
    }
    if !existing.is_empty() {
        queries::delete_assignments(&tx, booking_id)?;
    }

    let free = queries::free_motorcycles(&tx, booking.start_date, booking.end_date, booking_id)?;
    if free.len() < booking.bike_quantity as usize {
        return Err(AssignmentError::NotEnoughMotorcycles {
            requested: booking.bike_quantity,
            free: free.len() as u32,
        });
    }

    let chosen: Vec<Motorcycle> = free
        .into_iter()
        .take(booking.bike_quantity as usize)
        .collect();
    for motorcycle in &chosen {
        queries::insert_assignment(&tx, booking_id, motorcycle.id)?;
    }

    tx.commit()?;

    tracing::info!(
        booking_id = %booking_id,
        motorcycles = ?chosen.iter().map(|m| m.id).collect::<Vec<_>>(),
        "assigned motorcycles"
    );

    Ok(chosen)
}

pub fn release_motorcycles(conn: &Connection, booking_id: &str) -> anyhow::Result<usize> {
    let released = queries::delete_assignments(conn, booking_id)?;
    if released > 0 {
        tracing::info!(booking_id = %booking_id, released, "released motorcycles");
    }
    Ok(released)
}
