use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{
    AdminEvent, Booking, BookingStatus, Motorcycle, PaymentOption, PaymentProvider, PaymentStatus,
};
use crate::services::assignment;
use crate::services::availability;
use crate::services::booking::{build_booking, sync_assignments, validate_email, CustomerDetails};
use crate::services::notifications;
use crate::services::pricing;
use crate::state::AppState;

pub fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

// GET /api/admin/stats
#[derive(Serialize)]
pub struct StatsResponse {
    bookings_by_status: serde_json::Map<String, serde_json::Value>,
    upcoming_bookings: i64,
    unread_messages: i64,
    fleet_size: i64,
    collected_online_cents: i64,
}

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<StatsResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let today = chrono::Utc::now().date_naive();
    let stats = {
        let db = state.db()?;
        queries::get_dashboard_stats(&db, today)?
    };

    Ok(Json(StatsResponse {
        bookings_by_status: stats
            .bookings_by_status
            .into_iter()
            .map(|(status, count)| (status, serde_json::Value::from(count)))
            .collect(),
        upcoming_bookings: stats.upcoming_bookings,
        unread_messages: stats.unread_messages,
        fleet_size: stats.fleet_size,
        collected_online_cents: stats.collected_online_cents,
    }))
}

// GET /api/admin/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn get_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let status_filter = match query.status.as_deref() {
        Some(s) => Some(
            BookingStatus::parse(s)
                .ok_or_else(|| AppError::Validation(format!("unknown status: {s}")))?,
        ),
        None => None,
    };
    let limit = query.limit.unwrap_or(50).clamp(1, 500);

    let bookings = {
        let db = state.db()?;
        queries::get_all_bookings(&db, status_filter, limit)?
    };

    Ok(Json(bookings))
}

// GET /api/admin/bookings/:id
#[derive(Serialize)]
pub struct BookingDetail {
    booking: Booking,
    motorcycles: Vec<Motorcycle>,
    paid_online_cents: i64,
    remaining_due_cents: i64,
}

impl BookingDetail {
    fn new(booking: Booking, motorcycles: Vec<Motorcycle>) -> Self {
        Self {
            paid_online_cents: booking.paid_online_cents(),
            remaining_due_cents: booking.remaining_due_cents(),
            booking,
            motorcycles,
        }
    }
}

fn load_detail(state: &AppState, id: &str) -> Result<BookingDetail, AppError> {
    let db = state.db()?;
    let booking = queries::get_booking_by_id(&db, id)?
        .ok_or_else(|| AppError::NotFound("booking not found".to_string()))?;
    let motorcycles = queries::get_assigned_motorcycles(&db, id)?;
    Ok(BookingDetail::new(booking, motorcycles))
}

pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingDetail>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    Ok(Json(load_detail(&state, &id)?))
}

// POST /api/admin/bookings
#[derive(Deserialize)]
pub struct ManualBookingRequest {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub bike_quantity: u32,
    pub status: Option<BookingStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_option: Option<PaymentOption>,
    pub total_price_cents: Option<i64>,
    pub notes: Option<String>,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ManualBookingRequest>,
) -> Result<Json<BookingDetail>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let customer = CustomerDetails::new(
        &body.customer_name,
        &body.customer_email,
        body.customer_phone.as_deref(),
        body.notes.as_deref(),
    );
    customer.validate()?;

    let mut quote = pricing::quote(
        &state.config.pricing,
        body.start_date,
        body.end_date,
        body.bike_quantity,
    )?;
    if let Some(total) = body.total_price_cents {
        if total < 0 {
            return Err(AppError::Validation("total_price_cents must not be negative".to_string()));
        }
        quote.total_cents = total;
        quote.down_payment_cents = pricing::down_payment_for(&state.config.pricing, total)?;
    }

    let mut booking = build_booking(
        &customer,
        &quote,
        PaymentProvider::Manual,
        body.payment_option.unwrap_or(PaymentOption::Full),
        body.status.unwrap_or(BookingStatus::Confirmed),
    );
    booking.amount_due_online_cents = 0;
    booking.webhook_received = true;
    if let Some(payment_status) = body.payment_status {
        booking.payment_status = payment_status;
    }

    let motorcycles = {
        let mut db = state.db()?;
        if booking.status.is_active() {
            availability::ensure_available(
                &db,
                booking.start_date,
                booking.end_date,
                booking.bike_quantity,
                None,
            )?;
        }
        queries::insert_booking(&db, &booking)?;
        match sync_assignments(&mut db, &booking) {
            Ok(motorcycles) => motorcycles,
            Err(e) => {
                queries::delete_booking(&db, &booking.id)?;
                return Err(e.into());
            }
        }
    };

    tracing::info!(booking_id = %booking.id, status = booking.status.as_str(), "manual booking created");
    state.publish(AdminEvent::booking(
        "booking_created",
        &booking.id,
        format!("manual booking for {}", booking.customer_name),
    ));

    Ok(Json(BookingDetail::new(booking, motorcycles)))
}

// PATCH /api/admin/bookings/:id
#[derive(Deserialize, Default)]
pub struct UpdateBookingRequest {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub bike_quantity: Option<u32>,
    pub status: Option<BookingStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub total_price_cents: Option<i64>,
    pub notes: Option<String>,
}

pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateBookingRequest>,
) -> Result<Json<BookingDetail>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let detail = {
        let mut db = state.db()?;
        let mut booking = queries::get_booking_by_id(&db, &id)?
            .ok_or_else(|| AppError::NotFound("booking not found".to_string()))?;
        let was_active = booking.status.is_active();

        if let Some(name) = body.customer_name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(AppError::Validation("customer name is required".to_string()));
            }
            booking.customer_name = name;
        }
        if let Some(email) = body.customer_email {
            let email = email.trim().to_string();
            validate_email(&email)?;
            booking.customer_email = email;
        }
        if let Some(phone) = body.customer_phone {
            booking.customer_phone = phone.trim().to_string();
        }
        if let Some(notes) = body.notes {
            let notes = notes.trim().to_string();
            booking.notes = (!notes.is_empty()).then_some(notes);
        }

        let start = body.start_date.unwrap_or(booking.start_date);
        let end = body.end_date.unwrap_or(booking.end_date);
        let quantity = body.bike_quantity.unwrap_or(booking.bike_quantity);
        let range_changed =
            start != booking.start_date || end != booking.end_date || quantity != booking.bike_quantity;

        if range_changed {
            let quote = pricing::quote(&state.config.pricing, start, end, quantity)?;
            booking.start_date = start;
            booking.end_date = end;
            booking.bike_quantity = quantity;
            booking.total_price_cents = quote.total_cents;
            booking.down_payment_cents = quote.down_payment_cents;
            booking.deposit_cents = quote.deposit_cents;
        }
        if let Some(total) = body.total_price_cents {
            if total < 0 {
                return Err(AppError::Validation("total_price_cents must not be negative".to_string()));
            }
            booking.total_price_cents = total;
            booking.down_payment_cents = pricing::down_payment_for(&state.config.pricing, total)?;
        }
        if let Some(status) = body.status {
            booking.status = status;
        }
        if let Some(payment_status) = body.payment_status {
            booking.payment_status = payment_status;
        }

        // Nothing is written unless the booking can end up holding its bikes.
        let holds_quantity =
            queries::get_assignments(&db, &booking.id)?.len() == booking.bike_quantity as usize;
        if booking.status.is_active() && (range_changed || !was_active || !holds_quantity) {
            availability::ensure_available(
                &db,
                booking.start_date,
                booking.end_date,
                booking.bike_quantity,
                Some(booking.id.as_str()),
            )?;
        }

        if range_changed {
            assignment::release_motorcycles(&db, &booking.id)?;
        }
        queries::update_booking(&db, &booking)?;
        let motorcycles = sync_assignments(&mut db, &booking)?;

        BookingDetail::new(booking, motorcycles)
    };

    tracing::info!(booking_id = %id, status = detail.booking.status.as_str(), "booking updated");
    state.publish(AdminEvent::booking(
        "booking_updated",
        &id,
        format!("booking is {}", detail.booking.status.as_str()),
    ));

    Ok(Json(detail))
}

// POST /api/admin/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    {
        let db = state.db()?;
        if !queries::update_booking_status(&db, &id, BookingStatus::Cancelled)? {
            return Err(AppError::NotFound("booking not found".to_string()));
        }
        assignment::release_motorcycles(&db, &id)?;
    }

    tracing::info!(booking_id = %id, "booking cancelled");
    state.publish(AdminEvent::booking("booking_cancelled", &id, "booking cancelled"));

    Ok(Json(serde_json::json!({"ok": true})))
}

// POST /api/admin/bookings/:id/assign
pub async fn assign_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Vec<Motorcycle>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let motorcycles = {
        let mut db = state.db()?;
        assignment::assign_motorcycles(&mut db, &id)?
    };

    Ok(Json(motorcycles))
}

// POST /api/admin/bookings/:id/email
pub async fn resend_confirmation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let detail = load_detail(&state, &id)?;
    notifications::send_customer_confirmation(&state, &detail.booking, &detail.motorcycles)
        .await
        .context("failed to send confirmation email")?;

    tracing::info!(booking_id = %id, "confirmation email resent");
    Ok(Json(serde_json::json!({"ok": true})))
}

// DELETE /api/admin/bookings/:id
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let deleted = {
        let db = state.db()?;
        queries::delete_booking(&db, &id)?
    };

    if !deleted {
        return Err(AppError::NotFound("booking not found".to_string()));
    }

    tracing::info!(booking_id = %id, "booking deleted");
    state.publish(AdminEvent::booking("booking_deleted", &id, "booking deleted"));
    Ok(Json(serde_json::json!({"ok": true})))
}
