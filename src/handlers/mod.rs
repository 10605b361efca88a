pub mod admin;
pub mod booking;
pub mod calendar;
pub mod contact;
pub mod events;
pub mod fleet;
pub mod health;
pub mod messages;
pub mod webhook;
