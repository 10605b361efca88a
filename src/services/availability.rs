use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilityReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub fleet_size: u32,
    pub booked: u32,
    pub available: u32,
    pub requested: u32,
    pub is_available: bool,
}

/// Counts motorcycles free for every day of `[start, end]`.
///
/// `exclude_booking` leaves one booking's own assignments out of the count,
/// so an edit can be checked against everything else.
pub fn check_availability(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
    requested: u32,
    exclude_booking: Option<&str>,
) -> anyhow::Result<AvailabilityReport> {
    let fleet_size = queries::fleet_size(conn)?.max(0) as u32;
    let booked = queries::count_booked_motorcycles(conn, start, end, exclude_booking)?.max(0) as u32;
    let available = fleet_size.saturating_sub(booked);

    Ok(AvailabilityReport {
        start_date: start,
        end_date: end,
        fleet_size,
        booked,
        available,
        requested,
        is_available: requested <= available,
    })
}

pub fn ensure_available(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
    requested: u32,
    exclude_booking: Option<&str>,
) -> Result<AvailabilityReport, AppError> {
    let report = check_availability(conn, start, end, requested, exclude_booking)?;
    if !report.is_available {
        tracing::info!(
            start = %start,
            end = %end,
            requested,
            available = report.available,
            "not enough motorcycles for requested dates"
        );
        return Err(AppError::Unavailable {
            requested,
            available: report.available,
        });
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{BookingStatus, PaymentOption, PaymentProvider};
    use crate::services::booking::{build_booking, CustomerDetails};
    use crate::services::pricing::{quote, PricingConfig};

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn book(conn: &Connection, start: &str, end: &str, quantity: u32, status: BookingStatus) -> String {
        let customer = CustomerDetails {
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            phone: String::new(),
            notes: None,
        };
        let quote = quote(&PricingConfig::default(), date(start), date(end), quantity).unwrap();
        let booking = build_booking(
            &customer,
            &quote,
            PaymentProvider::Manual,
            PaymentOption::Full,
            status,
        );
        queries::insert_booking(conn, &booking).unwrap();
        let free = queries::free_motorcycles(conn, date(start), date(end), &booking.id).unwrap();
        for m in free.iter().take(quantity as usize) {
            queries::insert_assignment(conn, &booking.id, m.id).unwrap();
        }
        booking.id
    }

    #[test]
    fn test_empty_calendar_has_whole_fleet() {
        let conn = setup_db();
        let report =
            check_availability(&conn, date("2025-07-01"), date("2025-07-05"), 2, None).unwrap();
        assert_eq!(report.fleet_size, 5);
        assert_eq!(report.available, 5);
        assert!(report.is_available);
    }

    #[test]
    fn test_overlapping_booking_reduces_availability() {
        let conn = setup_db();
        book(&conn, "2025-07-03", "2025-07-08", 2, BookingStatus::Confirmed);

        let report =
            check_availability(&conn, date("2025-07-01"), date("2025-07-04"), 4, None).unwrap();
        assert_eq!(report.booked, 2);
        assert_eq!(report.available, 3);
        assert!(!report.is_available);
    }

    #[test]
    fn test_handover_day_counts_as_overlap() {
        let conn = setup_db();
        book(&conn, "2025-07-01", "2025-07-03", 5, BookingStatus::FullyPaid);

        let report =
            check_availability(&conn, date("2025-07-03"), date("2025-07-05"), 1, None).unwrap();
        assert_eq!(report.available, 0);

        let report =
            check_availability(&conn, date("2025-07-04"), date("2025-07-05"), 1, None).unwrap();
        assert_eq!(report.available, 5);
    }

    #[test]
    fn test_inactive_bookings_do_not_count() {
        let conn = setup_db();
        book(&conn, "2025-07-01", "2025-07-03", 3, BookingStatus::Cancelled);
        book(&conn, "2025-07-01", "2025-07-03", 1, BookingStatus::Failed);

        let report =
            check_availability(&conn, date("2025-07-01"), date("2025-07-03"), 5, None).unwrap();
        assert_eq!(report.available, 5);
    }

    #[test]
    fn test_exclude_booking_ignores_own_assignments() {
        let conn = setup_db();
        let id = book(&conn, "2025-07-01", "2025-07-03", 5, BookingStatus::Confirmed);

        assert!(ensure_available(&conn, date("2025-07-02"), date("2025-07-04"), 5, None).is_err());
        let report =
            ensure_available(&conn, date("2025-07-02"), date("2025-07-04"), 5, Some(id.as_str())).unwrap();
        assert_eq!(report.available, 5);
    }

    #[test]
    fn test_disabled_motorcycle_shrinks_fleet() {
        let conn = setup_db();
        queries::update_motorcycle(&conn, 1, "Honda Africa Twin #1", false).unwrap();

        let err = ensure_available(&conn, date("2025-07-01"), date("2025-07-02"), 5, None).unwrap_err();
        assert!(matches!(
            err,
            AppError::Unavailable {
                requested: 5,
                available: 4
            }
        ));
    }
}
