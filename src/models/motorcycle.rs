use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Motorcycle {
    pub id: i64,
    pub name: String,
    pub is_available: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingMotorcycle {
    pub booking_id: String,
    pub motorcycle_id: i64,
    pub assigned_at: String,
}
