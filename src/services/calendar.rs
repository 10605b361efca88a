use chrono::Duration;

use crate::models::{Booking, Motorcycle};

/// All-day iCalendar event spanning pickup to return day.
pub fn generate_ics(booking: &Booking, motorcycles: &[Motorcycle]) -> String {
    let dtstart = booking.start_date.format("%Y%m%d").to_string();
    // DTEND is exclusive for all-day events
    let dtend = (booking.end_date + Duration::days(1))
        .format("%Y%m%d")
        .to_string();
    let dtstamp = booking.created_at.format("%Y%m%dT%H%M%SZ").to_string();
    let uid = format!("{}@motorent", booking.id);

    let summary = if booking.bike_quantity == 1 {
        "Motorcycle rental".to_string()
    } else {
        format!("Motorcycle rental ({} bikes)", booking.bike_quantity)
    };
    let description = if motorcycles.is_empty() {
        format!("Booking {}", booking.id)
    } else {
        let names: Vec<&str> = motorcycles.iter().map(|m| m.name.as_str()).collect();
        format!("Booking {}\\nMotorcycles: {}", booking.id, escape_text(&names.join(", ")))
    };

    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Motorent//Rentals//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART;VALUE=DATE:{dtstart}\r\n\
         DTEND;VALUE=DATE:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         DESCRIPTION:{description}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    )
}

fn escape_text(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    use crate::models::{BookingStatus, PaymentOption, PaymentProvider, PaymentStatus};

    fn booking(quantity: u32) -> Booking {
        let created =
            NaiveDateTime::parse_from_str("2025-06-10 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        Booking {
            id: "test-123".to_string(),
            customer_name: "Alice".to_string(),
            customer_email: "alice@example.com".to_string(),
            customer_phone: String::new(),
            start_date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 7, 3).unwrap(),
            bike_quantity: quantity,
            total_price_cents: 24_000,
            down_payment_cents: 7_200,
            deposit_cents: 50_000,
            amount_due_online_cents: 7_200,
            currency: "eur".to_string(),
            status: BookingStatus::Confirmed,
            payment_status: PaymentStatus::DownPaymentPaid,
            payment_provider: PaymentProvider::Stripe,
            payment_option: PaymentOption::DownPayment,
            stripe_session_id: None,
            stripe_payment_intent: None,
            paylink_order_id: None,
            paylink_transaction_id: None,
            webhook_received: true,
            notes: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_generate_ics() {
        let bikes = vec![Motorcycle {
            id: 3,
            name: "BMW R 1250 GS".to_string(),
            is_available: true,
            created_at: String::new(),
        }];
        let ics = generate_ics(&booking(1), &bikes);
        assert!(ics.contains("BEGIN:VCALENDAR"));
        assert!(ics.contains("DTSTART;VALUE=DATE:20250701"));
        assert!(ics.contains("DTEND;VALUE=DATE:20250704"));
        assert!(ics.contains("SUMMARY:Motorcycle rental\r\n"));
        assert!(ics.contains("Motorcycles: BMW R 1250 GS"));
        assert!(ics.contains("UID:test-123@motorent"));
        assert!(ics.ends_with("END:VCALENDAR\r\n"));
    }

    #[test]
    fn test_generate_ics_multiple_bikes_unassigned() {
        let ics = generate_ics(&booking(3), &[]);
        assert!(ics.contains("SUMMARY:Motorcycle rental (3 bikes)"));
        assert!(ics.contains("DESCRIPTION:Booking test-123\r\n"));
    }
}
