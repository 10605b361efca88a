use serde::Serialize;

/// Something the back office should see as it happens.
#[derive(Clone, Debug, Serialize)]
pub struct AdminEvent {
    pub kind: String,
    pub booking_id: Option<String>,
    pub message_id: Option<i64>,
    pub summary: String,
    pub created_at: String,
}

impl AdminEvent {
    pub fn booking(kind: &str, booking_id: &str, summary: impl Into<String>) -> Self {
        Self {
            kind: kind.to_string(),
            booking_id: Some(booking_id.to_string()),
            message_id: None,
            summary: summary.into(),
            created_at: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    pub fn message(message_id: i64, summary: impl Into<String>) -> Self {
        Self {
            kind: "message_received".to_string(),
            booking_id: None,
            message_id: Some(message_id),
            summary: summary.into(),
            created_at: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}
