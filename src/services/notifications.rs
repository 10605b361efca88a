use crate::models::{Booking, Motorcycle};
use crate::state::AppState;

pub fn format_money(cents: i64, currency: &str) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    format!("{sign}{}.{:02} {}", cents / 100, cents % 100, currency.to_uppercase())
}

pub fn customer_confirmation(
    booking: &Booking,
    motorcycles: &[Motorcycle],
    site_url: &str,
) -> (String, String) {
    let subject = format!(
        "Your motorcycle rental is confirmed ({} to {})",
        booking.start_date, booking.end_date
    );

    let mut body = format!(
        "Hi {name},\n\n\
         Thank you for your booking. Here are the details:\n\n\
         Booking reference: {id}\n\
         Pickup: {start}\n\
         Return: {end}\n\
         Motorcycles: {qty}\n",
        name = booking.customer_name,
        id = booking.id,
        start = booking.start_date,
        end = booking.end_date,
        qty = booking.bike_quantity,
    );

    if !motorcycles.is_empty() {
        let names: Vec<&str> = motorcycles.iter().map(|m| m.name.as_str()).collect();
        body.push_str(&format!("Assigned: {}\n", names.join(", ")));
    }

    body.push_str(&format!(
        "\nTotal price: {total}\n\
         Paid online: {paid}\n\
         Due at pickup: {due}\n\
         Refundable deposit at pickup: {deposit}\n\n\
         Add it to your calendar: {site_url}/calendar/{id}.ics\n\n\
         See you soon!\n",
        total = format_money(booking.total_price_cents, &booking.currency),
        paid = format_money(booking.paid_online_cents(), &booking.currency),
        due = format_money(booking.remaining_due_cents(), &booking.currency),
        deposit = format_money(booking.deposit_cents, &booking.currency),
        id = booking.id,
    ));

    (subject, body)
}

pub fn shop_new_booking(booking: &Booking) -> (String, String) {
    let subject = format!(
        "New booking: {} x{} ({} to {})",
        booking.customer_name, booking.bike_quantity, booking.start_date, booking.end_date
    );
    let body = format!(
        "Booking {id} is {status} ({payment}).\n\n\
         Customer: {name} <{email}> {phone}\n\
         Dates: {start} to {end}\n\
         Motorcycles: {qty}\n\
         Total: {total}, collected online: {online} via {provider}\n\
         Notes: {notes}\n",
        id = booking.id,
        status = booking.status.as_str(),
        payment = booking.payment_status.as_str(),
        name = booking.customer_name,
        email = booking.customer_email,
        phone = booking.customer_phone,
        start = booking.start_date,
        end = booking.end_date,
        qty = booking.bike_quantity,
        total = format_money(booking.total_price_cents, &booking.currency),
        online = format_money(booking.amount_due_online_cents, &booking.currency),
        provider = booking.payment_provider.as_str(),
        notes = booking.notes.as_deref().unwrap_or("-"),
    );
    (subject, body)
}

pub fn shop_assignment_failed(booking: &Booking, reason: &str) -> (String, String) {
    let subject = format!("Action needed: assign motorcycles to booking {}", booking.id);
    let body = format!(
        "Payment for booking {id} was received but motorcycles could not be assigned automatically.\n\n\
         Reason: {reason}\n\
         Dates: {start} to {end}\n\
         Motorcycles requested: {qty}\n\
         Customer: {name} <{email}>\n",
        id = booking.id,
        start = booking.start_date,
        end = booking.end_date,
        qty = booking.bike_quantity,
        name = booking.customer_name,
        email = booking.customer_email,
    );
    (subject, body)
}

pub fn shop_contact_message(name: &str, email: &str, phone: Option<&str>, message: &str) -> (String, String) {
    let subject = format!("New message from {name}");
    let body = format!(
        "From: {name} <{email}>\nPhone: {phone}\n\n{message}\n",
        phone = phone.unwrap_or("-"),
    );
    (subject, body)
}

pub async fn send_customer_confirmation(
    state: &AppState,
    booking: &Booking,
    motorcycles: &[Motorcycle],
) -> anyhow::Result<()> {
    let (subject, body) = customer_confirmation(booking, motorcycles, &state.config.site_url);
    state
        .email
        .send_email(&booking.customer_email, &subject, &body)
        .await
}

/// Emails the shop inbox. Failures are logged, never returned.
pub async fn notify_shop(state: &AppState, subject: &str, body: &str) {
    if state.config.shop_email.is_empty() {
        tracing::warn!(subject = %subject, "SHOP_EMAIL not configured, skipping notification");
        return;
    }
    if let Err(e) = state
        .email
        .send_email(&state.config.shop_email, subject, body)
        .await
    {
        tracing::error!(error = %e, subject = %subject, "failed to notify shop");
    }
}
