pub mod assignment;
pub mod availability;
pub mod booking;
pub mod calendar;
pub mod email;
pub mod notifications;
pub mod payments;
pub mod pricing;
