use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{
    AdminEvent, Booking, BookingStatus, Motorcycle, PaymentOption, PaymentProvider, PaymentStatus,
};
use crate::services::assignment::{self, AssignmentError};
use crate::services::availability;
use crate::services::notifications;
use crate::services::payments::CheckoutRequest;
use crate::services::pricing::{self, Quote};
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct CustomerDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub notes: Option<String>,
}

impl CustomerDetails {
    pub fn new(name: &str, email: &str, phone: Option<&str>, notes: Option<&str>) -> Self {
        Self {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            phone: phone.map(str::trim).unwrap_or_default().to_string(),
            notes: notes
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.is_empty() {
            return Err(AppError::Validation("customer name is required".to_string()));
        }
        validate_email(&self.email)
    }
}

pub fn validate_email(email: &str) -> Result<(), AppError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(AppError::Validation(format!("invalid email address: {email}"))),
    }
}

pub fn build_booking(
    customer: &CustomerDetails,
    quote: &Quote,
    provider: PaymentProvider,
    option: PaymentOption,
    status: BookingStatus,
) -> Booking {
    let now = Utc::now().naive_utc();
    let amount_due_online_cents = match option {
        PaymentOption::DownPayment => quote.down_payment_cents,
        PaymentOption::Full => quote.total_cents,
    };

    Booking {
        id: uuid::Uuid::new_v4().to_string(),
        customer_name: customer.name.clone(),
        customer_email: customer.email.clone(),
        customer_phone: customer.phone.clone(),
        start_date: quote.start_date,
        end_date: quote.end_date,
        bike_quantity: quote.quantity,
        total_price_cents: quote.total_cents,
        down_payment_cents: quote.down_payment_cents,
        deposit_cents: quote.deposit_cents,
        amount_due_online_cents,
        currency: quote.currency.clone(),
        status,
        payment_status: PaymentStatus::Unpaid,
        payment_provider: provider,
        payment_option: option,
        stripe_session_id: None,
        stripe_payment_intent: None,
        paylink_order_id: None,
        paylink_transaction_id: None,
        webhook_received: false,
        notes: customer.notes.clone(),
        created_at: now,
        updated_at: now,
    }
}

/// Stores a booking awaiting payment after checking the fleet can cover it.
pub fn create_pending_booking(
    conn: &Connection,
    customer: &CustomerDetails,
    quote: &Quote,
    provider: PaymentProvider,
    option: PaymentOption,
) -> Result<Booking, AppError> {
    availability::ensure_available(conn, quote.start_date, quote.end_date, quote.quantity, None)?;

    let booking = build_booking(customer, quote, provider, option, BookingStatus::Pending);
    queries::insert_booking(conn, &booking)?;

    tracing::info!(
        booking_id = %booking.id,
        provider = booking.payment_provider.as_str(),
        start = %booking.start_date,
        end = %booking.end_date,
        quantity = booking.bike_quantity,
        "created pending booking"
    );

    Ok(booking)
}

/// Assigns motorcycles to active bookings and frees them from inactive ones.
pub fn sync_assignments(
    conn: &mut Connection,
    booking: &Booking,
) -> Result<Vec<Motorcycle>, AssignmentError> {
    if booking.status.is_active() {
        assignment::assign_motorcycles(conn, &booking.id)
    } else {
        assignment::release_motorcycles(conn, &booking.id)?;
        Ok(vec![])
    }
}

// ── Checkout ──

#[derive(Debug, Clone)]
pub struct CheckoutForm {
    pub customer: CustomerDetails,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub bike_quantity: u32,
    pub provider: PaymentProvider,
    pub payment_option: PaymentOption,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub booking_id: String,
    pub checkout_url: String,
    pub amount_due_online_cents: i64,
    pub quote: Quote,
}

pub async fn start_checkout(state: &AppState, form: CheckoutForm) -> Result<CheckoutResponse, AppError> {
    form.customer.validate()?;

    let today = Utc::now().date_naive();
    if form.start_date < today {
        return Err(AppError::Validation("start_date is in the past".to_string()));
    }

    let gateway = state.gateway(form.provider).ok_or_else(|| {
        AppError::Validation("provider must be \"stripe\" or \"paylink\"".to_string())
    })?;

    let quote = pricing::quote(
        &state.config.pricing,
        form.start_date,
        form.end_date,
        form.bike_quantity,
    )?;

    let booking = {
        let db = state.db()?;
        create_pending_booking(&db, &form.customer, &quote, form.provider, form.payment_option)?
    };

    let site = &state.config.site_url;
    let request = CheckoutRequest {
        booking_id: booking.id.clone(),
        amount_cents: booking.amount_due_online_cents,
        currency: booking.currency.clone(),
        description: format!(
            "Motorcycle rental x{} ({} to {})",
            booking.bike_quantity, booking.start_date, booking.end_date
        ),
        customer_email: booking.customer_email.clone(),
        success_url: format!("{site}/booking/success?booking_id={}", booking.id),
        cancel_url: format!("{site}/booking/cancelled?booking_id={}", booking.id),
        callback_url: format!("{site}/webhook/paylink"),
    };

    let link = match gateway.create_checkout(&request).await {
        Ok(link) => link,
        Err(e) => {
            tracing::error!(error = %e, booking_id = %booking.id, "failed to create checkout");
            let db = state.db()?;
            queries::update_booking_status(&db, &booking.id, BookingStatus::Failed)?;
            return Err(AppError::Payment(e.to_string()));
        }
    };

    {
        let db = state.db()?;
        match form.provider {
            PaymentProvider::Stripe => queries::set_stripe_session(&db, &booking.id, &link.id)?,
            PaymentProvider::Paylink => queries::set_paylink_order(&db, &booking.id, &link.id)?,
            PaymentProvider::Manual => {}
        }
    }

    state.publish(AdminEvent::booking(
        "booking_created",
        &booking.id,
        format!(
            "{} started checkout for {} bike(s), {} to {}",
            booking.customer_name, booking.bike_quantity, booking.start_date, booking.end_date
        ),
    ));

    Ok(CheckoutResponse {
        booking_id: booking.id,
        checkout_url: link.url,
        amount_due_online_cents: booking.amount_due_online_cents,
        quote,
    })
}

// ── Webhook continuations ──

#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub provider: PaymentProvider,
    /// Provider transaction reference (payment intent or transaction id).
    pub reference: Option<String>,
    pub amount_cents: Option<i64>,
}

#[derive(Debug)]
pub enum ConfirmOutcome {
    Confirmed {
        booking: Booking,
        motorcycles: Vec<Motorcycle>,
    },
    AlreadyProcessed,
    /// The payment came from a provider the booking was not checked out with.
    WrongProvider,
}

pub async fn confirm_payment(
    state: &AppState,
    booking_id: &str,
    confirmation: PaymentConfirmation,
) -> Result<ConfirmOutcome, AppError> {
    let (booking, assignment) = {
        let mut db = state.db()?;
        let mut booking = queries::get_booking_by_id(&db, booking_id)?
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

        if booking.payment_provider != confirmation.provider {
            tracing::warn!(
                booking_id = %booking_id,
                expected = booking.payment_provider.as_str(),
                received = confirmation.provider.as_str(),
                "payment reported by the wrong provider, ignoring"
            );
            return Ok(ConfirmOutcome::WrongProvider);
        }

        if booking.webhook_received {
            tracing::info!(booking_id = %booking_id, "payment already processed, ignoring webhook");
            return Ok(ConfirmOutcome::AlreadyProcessed);
        }

        if booking.status != BookingStatus::Pending {
            tracing::warn!(
                booking_id = %booking_id,
                status = booking.status.as_str(),
                "payment received for booking that is not pending"
            );
        }

        if let Some(amount) = confirmation.amount_cents {
            if amount != booking.amount_due_online_cents {
                tracing::warn!(
                    booking_id = %booking_id,
                    expected = booking.amount_due_online_cents,
                    received = amount,
                    "payment amount differs from amount due online"
                );
            }
        }

        let (status, payment_status) = match booking.payment_option {
            PaymentOption::DownPayment => (BookingStatus::Confirmed, PaymentStatus::DownPaymentPaid),
            PaymentOption::Full => (BookingStatus::FullyPaid, PaymentStatus::Paid),
        };
        booking.status = status;
        booking.payment_status = payment_status;
        booking.webhook_received = true;
        match confirmation.provider {
            PaymentProvider::Stripe => booking.stripe_payment_intent = confirmation.reference,
            PaymentProvider::Paylink => booking.paylink_transaction_id = confirmation.reference,
            PaymentProvider::Manual => {}
        }
        queries::update_booking(&db, &booking)?;

        tracing::info!(
            booking_id = %booking_id,
            status = booking.status.as_str(),
            provider = confirmation.provider.as_str(),
            "payment confirmed"
        );

        let assignment = assignment::assign_motorcycles(&mut db, booking_id);
        (booking, assignment)
    };

    let motorcycles = match assignment {
        Ok(motorcycles) => motorcycles,
        Err(e) => {
            tracing::error!(error = %e, booking_id = %booking_id, "failed to assign motorcycles");
            let (subject, body) = notifications::shop_assignment_failed(&booking, &e.to_string());
            notifications::notify_shop(state, &subject, &body).await;
            vec![]
        }
    };

    if let Err(e) = notifications::send_customer_confirmation(state, &booking, &motorcycles).await {
        tracing::error!(error = %e, booking_id = %booking_id, "failed to send confirmation email");
    }
    let (subject, body) = notifications::shop_new_booking(&booking);
    notifications::notify_shop(state, &subject, &body).await;

    state.publish(AdminEvent::booking(
        "booking_confirmed",
        &booking.id,
        format!(
            "{} paid for {} bike(s), {} to {}",
            booking.customer_name, booking.bike_quantity, booking.start_date, booking.end_date
        ),
    ));

    Ok(ConfirmOutcome::Confirmed {
        booking,
        motorcycles,
    })
}

/// Marks an unpaid booking as failed. Returns false when the booking had
/// already been paid, which a late failure event must not undo.
pub fn fail_payment(
    state: &AppState,
    booking_id: &str,
    payment_status: PaymentStatus,
) -> Result<bool, AppError> {
    {
        let db = state.db()?;
        let mut booking = queries::get_booking_by_id(&db, booking_id)?
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

        if booking.webhook_received || booking.status.is_active() {
            tracing::warn!(
                booking_id = %booking_id,
                status = booking.status.as_str(),
                "ignoring payment failure for booking that was already paid"
            );
            return Ok(false);
        }

        booking.status = BookingStatus::Failed;
        booking.payment_status = payment_status;
        queries::update_booking(&db, &booking)?;
        assignment::release_motorcycles(&db, booking_id)?;
    }

    tracing::info!(
        booking_id = %booking_id,
        payment_status = payment_status.as_str(),
        "payment failed"
    );
    state.publish(AdminEvent::booking(
        "payment_failed",
        booking_id,
        format!("payment {}", payment_status.as_str()),
    ));

    Ok(true)
}
