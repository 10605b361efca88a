use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{
    Booking, BookingMotorcycle, BookingStatus, Message, MessageStatus, Motorcycle, PaymentOption,
    PaymentProvider, PaymentStatus,
};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const BOOKING_COLUMNS: &str = "id, customer_name, customer_email, customer_phone, start_date, end_date, \
     bike_quantity, total_price_cents, down_payment_cents, deposit_cents, amount_due_online_cents, \
     currency, status, payment_status, payment_provider, payment_option, stripe_session_id, \
     stripe_payment_intent, paylink_order_id, paylink_transaction_id, webhook_received, notes, \
     created_at, updated_at";

fn now_timestamp() -> String {
    Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string()
}

fn fmt_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

// ── Bookings ──

pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)"
        ),
        params![
            booking.id,
            booking.customer_name,
            booking.customer_email,
            booking.customer_phone,
            fmt_date(&booking.start_date),
            fmt_date(&booking.end_date),
            booking.bike_quantity,
            booking.total_price_cents,
            booking.down_payment_cents,
            booking.deposit_cents,
            booking.amount_due_online_cents,
            booking.currency,
            booking.status.as_str(),
            booking.payment_status.as_str(),
            booking.payment_provider.as_str(),
            booking.payment_option.as_str(),
            booking.stripe_session_id,
            booking.stripe_payment_intent,
            booking.paylink_order_id,
            booking.paylink_transaction_id,
            booking.webhook_received,
            booking.notes,
            booking.created_at.format(TIMESTAMP_FORMAT).to_string(),
            booking.updated_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )
    .context("failed to insert booking")?;
    Ok(())
}

/// Writes every mutable column of `booking` back and bumps `updated_at`.
pub fn update_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<bool> {
    let count = conn
        .execute(
            "UPDATE bookings SET
               customer_name = ?1, customer_email = ?2, customer_phone = ?3,
               start_date = ?4, end_date = ?5, bike_quantity = ?6,
               total_price_cents = ?7, down_payment_cents = ?8, deposit_cents = ?9,
               amount_due_online_cents = ?10, currency = ?11, status = ?12, payment_status = ?13,
               payment_provider = ?14, payment_option = ?15, stripe_session_id = ?16,
               stripe_payment_intent = ?17, paylink_order_id = ?18, paylink_transaction_id = ?19,
               webhook_received = ?20, notes = ?21, updated_at = ?22
             WHERE id = ?23",
            params![
                booking.customer_name,
                booking.customer_email,
                booking.customer_phone,
                fmt_date(&booking.start_date),
                fmt_date(&booking.end_date),
                booking.bike_quantity,
                booking.total_price_cents,
                booking.down_payment_cents,
                booking.deposit_cents,
                booking.amount_due_online_cents,
                booking.currency,
                booking.status.as_str(),
                booking.payment_status.as_str(),
                booking.payment_provider.as_str(),
                booking.payment_option.as_str(),
                booking.stripe_session_id,
                booking.stripe_payment_intent,
                booking.paylink_order_id,
                booking.paylink_transaction_id,
                booking.webhook_received,
                booking.notes,
                now_timestamp(),
                booking.id,
            ],
        )
        .context("failed to update booking")?;
    Ok(count > 0)
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now_timestamp(), id],
    )?;
    Ok(count > 0)
}

pub fn set_stripe_session(conn: &Connection, id: &str, session_id: &str) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE bookings SET stripe_session_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![session_id, now_timestamp(), id],
    )?;
    Ok(())
}

pub fn set_paylink_order(conn: &Connection, id: &str, order_id: &str) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE bookings SET paylink_order_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![order_id, now_timestamp(), id],
    )?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_booking_by_stripe_session(
    conn: &Connection,
    session_id: &str,
) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE stripe_session_id = ?1"),
        params![session_id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_all_bookings(
    conn: &Connection,
    status_filter: Option<BookingStatus>,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    let (sql, params_vec): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match status_filter {
        Some(status) => (
            format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings WHERE status = ?1 \
                 ORDER BY created_at DESC, start_date DESC LIMIT ?2"
            ),
            vec![
                Box::new(status.as_str()) as Box<dyn rusqlite::types::ToSql>,
                Box::new(limit),
            ],
        ),
        None => (
            format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings \
                 ORDER BY created_at DESC, start_date DESC LIMIT ?1"
            ),
            vec![Box::new(limit) as Box<dyn rusqlite::types::ToSql>],
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn delete_booking(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM bookings WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let start_date_str: String = row.get(4)?;
    let end_date_str: String = row.get(5)?;
    let status_str: String = row.get(12)?;
    let payment_status_str: String = row.get(13)?;
    let provider_str: String = row.get(14)?;
    let option_str: String = row.get(15)?;
    let created_at_str: String = row.get(22)?;
    let updated_at_str: String = row.get(23)?;

    let start_date = NaiveDate::parse_from_str(&start_date_str, DATE_FORMAT)
        .with_context(|| format!("invalid start_date: {start_date_str}"))?;
    let end_date = NaiveDate::parse_from_str(&end_date_str, DATE_FORMAT)
        .with_context(|| format!("invalid end_date: {end_date_str}"))?;
    let created_at = NaiveDateTime::parse_from_str(&created_at_str, TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let updated_at = NaiveDateTime::parse_from_str(&updated_at_str, TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| Utc::now().naive_utc());

    Ok(Booking {
        id: row.get(0)?,
        customer_name: row.get(1)?,
        customer_email: row.get(2)?,
        customer_phone: row.get(3)?,
        start_date,
        end_date,
        bike_quantity: row.get(6)?,
        total_price_cents: row.get(7)?,
        down_payment_cents: row.get(8)?,
        deposit_cents: row.get(9)?,
        amount_due_online_cents: row.get(10)?,
        currency: row.get(11)?,
        status: BookingStatus::parse(&status_str).unwrap_or(BookingStatus::Pending),
        payment_status: PaymentStatus::parse(&payment_status_str).unwrap_or(PaymentStatus::Unpaid),
        payment_provider: PaymentProvider::parse(&provider_str).unwrap_or(PaymentProvider::Manual),
        payment_option: PaymentOption::parse(&option_str).unwrap_or_default(),
        stripe_session_id: row.get(16)?,
        stripe_payment_intent: row.get(17)?,
        paylink_order_id: row.get(18)?,
        paylink_transaction_id: row.get(19)?,
        webhook_received: row.get(20)?,
        notes: row.get(21)?,
        created_at,
        updated_at,
    })
}

// ── Dashboard ──

pub struct DashboardStats {
    pub bookings_by_status: Vec<(String, i64)>,
    pub upcoming_bookings: i64,
    pub unread_messages: i64,
    pub fleet_size: i64,
    pub collected_online_cents: i64,
}

pub fn get_dashboard_stats(conn: &Connection, today: NaiveDate) -> anyhow::Result<DashboardStats> {
    let mut stmt =
        conn.prepare("SELECT status, COUNT(*) FROM bookings GROUP BY status ORDER BY status")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
    let mut bookings_by_status = vec![];
    for row in rows {
        bookings_by_status.push(row?);
    }

    let upcoming_bookings: i64 = conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM bookings WHERE start_date >= ?1 AND status IN {}",
            BookingStatus::ACTIVE_SQL
        ),
        params![fmt_date(&today)],
        |row| row.get(0),
    )?;

    let unread_messages: i64 = conn.query_row(
        "SELECT COUNT(*) FROM messages WHERE status = 'new'",
        [],
        |row| row.get(0),
    )?;

    let collected_online_cents: i64 = conn.query_row(
        "SELECT COALESCE(SUM(CASE payment_status
             WHEN 'paid' THEN amount_due_online_cents
             WHEN 'down_payment_paid' THEN amount_due_online_cents
             ELSE 0 END), 0)
         FROM bookings WHERE payment_provider != 'manual'",
        [],
        |row| row.get(0),
    )?;

    Ok(DashboardStats {
        bookings_by_status,
        upcoming_bookings,
        unread_messages,
        fleet_size: fleet_size(conn)?,
        collected_online_cents,
    })
}

// ── Fleet ──

pub fn fleet_size(conn: &Connection) -> anyhow::Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM motorcycles WHERE is_available = 1",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn list_motorcycles(conn: &Connection) -> anyhow::Result<Vec<Motorcycle>> {
    let mut stmt =
        conn.prepare("SELECT id, name, is_available, created_at FROM motorcycles ORDER BY id ASC")?;
    let rows = stmt.query_map([], parse_motorcycle_row)?;

    let mut motorcycles = vec![];
    for row in rows {
        motorcycles.push(row?);
    }
    Ok(motorcycles)
}

pub fn get_motorcycle(conn: &Connection, id: i64) -> anyhow::Result<Option<Motorcycle>> {
    let motorcycle = conn
        .query_row(
            "SELECT id, name, is_available, created_at FROM motorcycles WHERE id = ?1",
            params![id],
            parse_motorcycle_row,
        )
        .optional()?;
    Ok(motorcycle)
}

pub fn insert_motorcycle(conn: &Connection, name: &str, is_available: bool) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO motorcycles (name, is_available) VALUES (?1, ?2)",
        params![name, is_available],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_motorcycle(
    conn: &Connection,
    id: i64,
    name: &str,
    is_available: bool,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE motorcycles SET name = ?1, is_available = ?2 WHERE id = ?3",
        params![name, is_available, id],
    )?;
    Ok(count > 0)
}

fn parse_motorcycle_row(row: &rusqlite::Row) -> rusqlite::Result<Motorcycle> {
    Ok(Motorcycle {
        id: row.get(0)?,
        name: row.get(1)?,
        is_available: row.get(2)?,
        created_at: row.get(3)?,
    })
}

// ── Availability & assignment ──

/// Distinct motorcycles held by active bookings overlapping `[start, end]`.
pub fn count_booked_motorcycles(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
    exclude_booking: Option<&str>,
) -> anyhow::Result<i64> {
    let count = conn.query_row(
        &format!(
            "SELECT COUNT(DISTINCT bm.motorcycle_id)
             FROM booking_motorcycles bm
             INNER JOIN bookings b ON b.id = bm.booking_id
             WHERE b.status IN {}
               AND b.start_date <= ?2 AND b.end_date >= ?1
               AND (?3 IS NULL OR b.id != ?3)",
            BookingStatus::ACTIVE_SQL
        ),
        params![fmt_date(&start), fmt_date(&end), exclude_booking],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Available motorcycles not held by any other active booking overlapping
/// `[start, end]`, lowest id first.
pub fn free_motorcycles(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
    exclude_booking: &str,
) -> anyhow::Result<Vec<Motorcycle>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT m.id, m.name, m.is_available, m.created_at
         FROM motorcycles m
         WHERE m.is_available = 1
           AND m.id NOT IN (
             SELECT bm.motorcycle_id
             FROM booking_motorcycles bm
             INNER JOIN bookings b ON b.id = bm.booking_id
             WHERE b.status IN {}
               AND b.start_date <= ?2 AND b.end_date >= ?1
               AND b.id != ?3
           )
         ORDER BY m.id ASC",
        BookingStatus::ACTIVE_SQL
    ))?;
    let rows = stmt.query_map(
        params![fmt_date(&start), fmt_date(&end), exclude_booking],
        parse_motorcycle_row,
    )?;

    let mut motorcycles = vec![];
    for row in rows {
        motorcycles.push(row?);
    }
    Ok(motorcycles)
}

pub fn insert_assignment(conn: &Connection, booking_id: &str, motorcycle_id: i64) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO booking_motorcycles (booking_id, motorcycle_id, assigned_at) VALUES (?1, ?2, ?3)",
        params![booking_id, motorcycle_id, now_timestamp()],
    )?;
    Ok(())
}

pub fn delete_assignments(conn: &Connection, booking_id: &str) -> anyhow::Result<usize> {
    let count = conn.execute(
        "DELETE FROM booking_motorcycles WHERE booking_id = ?1",
        params![booking_id],
    )?;
    Ok(count)
}

pub fn get_assignments(conn: &Connection, booking_id: &str) -> anyhow::Result<Vec<BookingMotorcycle>> {
    let mut stmt = conn.prepare(
        "SELECT booking_id, motorcycle_id, assigned_at FROM booking_motorcycles
         WHERE booking_id = ?1 ORDER BY motorcycle_id ASC",
    )?;
    let rows = stmt.query_map(params![booking_id], |row| {
        Ok(BookingMotorcycle {
            booking_id: row.get(0)?,
            motorcycle_id: row.get(1)?,
            assigned_at: row.get(2)?,
        })
    })?;

    let mut assignments = vec![];
    for row in rows {
        assignments.push(row?);
    }
    Ok(assignments)
}

pub fn get_assigned_motorcycles(conn: &Connection, booking_id: &str) -> anyhow::Result<Vec<Motorcycle>> {
    let mut stmt = conn.prepare(
        "SELECT m.id, m.name, m.is_available, m.created_at
         FROM motorcycles m
         INNER JOIN booking_motorcycles bm ON bm.motorcycle_id = m.id
         WHERE bm.booking_id = ?1
         ORDER BY m.id ASC",
    )?;
    let rows = stmt.query_map(params![booking_id], parse_motorcycle_row)?;

    let mut motorcycles = vec![];
    for row in rows {
        motorcycles.push(row?);
    }
    Ok(motorcycles)
}

/// Ids of motorcycles out with an active booking on `day`.
pub fn motorcycles_out_on(conn: &Connection, day: NaiveDate) -> anyhow::Result<Vec<i64>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT DISTINCT bm.motorcycle_id
         FROM booking_motorcycles bm
         INNER JOIN bookings b ON b.id = bm.booking_id
         WHERE b.status IN {} AND b.start_date <= ?1 AND b.end_date >= ?1",
        BookingStatus::ACTIVE_SQL
    ))?;
    let rows = stmt.query_map(params![fmt_date(&day)], |row| row.get(0))?;

    let mut ids = vec![];
    for row in rows {
        ids.push(row?);
    }
    Ok(ids)
}

// ── Messages ──

pub fn insert_message(
    conn: &Connection,
    name: &str,
    email: &str,
    phone: Option<&str>,
    body: &str,
) -> anyhow::Result<i64> {
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO messages (name, email, phone, body, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 'new', ?5, ?5)",
        params![name, email, phone, body, now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_messages(
    conn: &Connection,
    status_filter: Option<MessageStatus>,
    limit: i64,
) -> anyhow::Result<Vec<Message>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, email, phone, body, status, created_at, updated_at
         FROM messages WHERE (?1 IS NULL OR status = ?1)
         ORDER BY id DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![status_filter.map(|s| s.as_str()), limit], |row| {
        let status: String = row.get(5)?;
        Ok(Message {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            phone: row.get(3)?,
            body: row.get(4)?,
            status: MessageStatus::parse(&status).unwrap_or(MessageStatus::New),
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    })?;

    let mut messages = vec![];
    for row in rows {
        messages.push(row?);
    }
    Ok(messages)
}

pub fn update_message_status(
    conn: &Connection,
    id: i64,
    status: MessageStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE messages SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now_timestamp(), id],
    )?;
    Ok(count > 0)
}

pub fn delete_message(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM messages WHERE id = ?1", params![id])?;
    Ok(count > 0)
}
