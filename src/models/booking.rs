use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub bike_quantity: u32,
    pub total_price_cents: i64,
    pub down_payment_cents: i64,
    pub deposit_cents: i64,
    pub amount_due_online_cents: i64,
    pub currency: String,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub payment_provider: PaymentProvider,
    pub payment_option: PaymentOption,
    pub stripe_session_id: Option<String>,
    pub stripe_payment_intent: Option<String>,
    pub paylink_order_id: Option<String>,
    pub paylink_transaction_id: Option<String>,
    pub webhook_received: bool,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    /// Amount collected through the online checkout. Manual bookings never
    /// collect anything online.
    pub fn paid_online_cents(&self) -> i64 {
        match self.payment_status {
            PaymentStatus::DownPaymentPaid | PaymentStatus::Paid => self.amount_due_online_cents,
            _ => 0,
        }
    }

    /// Amount still owed at pickup, excluding the refundable deposit.
    pub fn remaining_due_cents(&self) -> i64 {
        (self.total_price_cents - self.paid_online_cents()).max(0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Paid,
    FullyPaid,
    Cancelled,
    Completed,
    Failed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Paid => "paid",
            BookingStatus::FullyPaid => "fully_paid",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
            BookingStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "paid" => Some(BookingStatus::Paid),
            "fully_paid" => Some(BookingStatus::FullyPaid),
            "cancelled" => Some(BookingStatus::Cancelled),
            "completed" => Some(BookingStatus::Completed),
            "failed" => Some(BookingStatus::Failed),
            _ => None,
        }
    }

    /// Active bookings hold motorcycles for their date range.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            BookingStatus::Confirmed
                | BookingStatus::Paid
                | BookingStatus::FullyPaid
                | BookingStatus::Completed
        )
    }

    /// SQL list literal matching [`BookingStatus::is_active`].
    pub const ACTIVE_SQL: &'static str = "('confirmed', 'paid', 'fully_paid', 'completed')";
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    DownPaymentPaid,
    Paid,
    Failed,
    Expired,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::DownPaymentPaid => "down_payment_paid",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Expired => "expired",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unpaid" => Some(PaymentStatus::Unpaid),
            "down_payment_paid" => Some(PaymentStatus::DownPaymentPaid),
            "paid" => Some(PaymentStatus::Paid),
            "failed" => Some(PaymentStatus::Failed),
            "expired" => Some(PaymentStatus::Expired),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentProvider {
    Stripe,
    Paylink,
    Manual,
}

impl PaymentProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::Stripe => "stripe",
            PaymentProvider::Paylink => "paylink",
            PaymentProvider::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "stripe" => Some(PaymentProvider::Stripe),
            "paylink" => Some(PaymentProvider::Paylink),
            "manual" => Some(PaymentProvider::Manual),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOption {
    #[default]
    DownPayment,
    Full,
}

impl PaymentOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentOption::DownPayment => "down_payment",
            PaymentOption::Full => "full",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "down_payment" => Some(PaymentOption::DownPayment),
            "full" => Some(PaymentOption::Full),
            _ => None,
        }
    }
}
