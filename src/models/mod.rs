pub mod admin_event;
pub mod booking;
pub mod message;
pub mod motorcycle;

pub use admin_event::AdminEvent;
pub use booking::{Booking, BookingStatus, PaymentOption, PaymentProvider, PaymentStatus};
pub use message::{Message, MessageStatus};
pub use motorcycle::{BookingMotorcycle, Motorcycle};
