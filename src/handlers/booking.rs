use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{BookingStatus, PaymentOption, PaymentProvider, PaymentStatus};
use crate::services::availability::{self, AvailabilityReport};
use crate::services::booking::{self, CheckoutForm, CheckoutResponse, CustomerDetails};
use crate::services::pricing::{self, Quote};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RangeQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub quantity: Option<u32>,
}

// GET /api/quote
pub async fn get_quote(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Quote>, AppError> {
    let quote = pricing::quote(
        &state.config.pricing,
        query.start_date,
        query.end_date,
        query.quantity.unwrap_or(1),
    )?;
    Ok(Json(quote))
}

// GET /api/availability
pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<AvailabilityReport>, AppError> {
    let quantity = query.quantity.unwrap_or(1);
    pricing::validate_range(query.start_date, query.end_date, quantity)?;

    let report = {
        let db = state.db()?;
        availability::check_availability(&db, query.start_date, query.end_date, quantity, None)?
    };
    Ok(Json(report))
}

// POST /api/checkout
#[derive(Deserialize)]
pub struct CheckoutBody {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub bike_quantity: u32,
    pub provider: PaymentProvider,
    #[serde(default)]
    pub payment_option: PaymentOption,
    pub notes: Option<String>,
}

pub async fn create_checkout(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CheckoutBody>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let form = CheckoutForm {
        customer: CustomerDetails::new(
            &body.customer_name,
            &body.customer_email,
            body.customer_phone.as_deref(),
            body.notes.as_deref(),
        ),
        start_date: body.start_date,
        end_date: body.end_date,
        bike_quantity: body.bike_quantity,
        provider: body.provider,
        payment_option: body.payment_option,
    };

    let response = booking::start_checkout(&state, form).await?;
    Ok(Json(response))
}

// GET /api/bookings/:id/status
#[derive(Serialize)]
pub struct BookingStatusResponse {
    id: String,
    status: BookingStatus,
    payment_status: PaymentStatus,
    start_date: NaiveDate,
    end_date: NaiveDate,
    bike_quantity: u32,
}

pub async fn get_booking_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BookingStatusResponse>, AppError> {
    let booking = {
        let db = state.db()?;
        queries::get_booking_by_id(&db, &id)?
    };
    let booking = booking.ok_or_else(|| AppError::NotFound("booking not found".to_string()))?;

    Ok(Json(BookingStatusResponse {
        id: booking.id,
        status: booking.status,
        payment_status: booking.payment_status,
        start_date: booking.start_date,
        end_date: booking.end_date,
        bike_quantity: booking.bike_quantity,
    }))
}
