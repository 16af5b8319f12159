use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::location::Coordinates;

/// Payload of `POST /emergency`, captured when a hold is confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyReport {
    pub user_id: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl EmergencyReport {
    pub fn new(user_id: impl Into<String>, position: Coordinates) -> Self {
        Self {
            user_id: user_id.into(),
            latitude: position.latitude,
            longitude: position.longitude,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "resolved")]
    Resolved,
    #[serde(other)]
    Unknown,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::InProgress => "in-progress",
            EventStatus::Resolved => "resolved",
            EventStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyEvent {
    pub id: i64,
    pub triggered_at: String,
    pub latitude: f64,
    pub longitude: f64,
    pub status: EventStatus,
}

impl EmergencyEvent {
    pub fn position(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    /// Parses `triggered_at`. Timestamps without an offset are taken as UTC.
    pub fn triggered_at_utc(&self) -> Option<DateTime<Utc>> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&self.triggered_at) {
            return Some(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&self.triggered_at, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(&self.triggered_at, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// Local wall-clock rendering, or the raw string when unparseable.
    pub fn triggered_at_display(&self) -> String {
        self.triggered_at_utc()
            .map(|at| {
                at.with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            })
            .unwrap_or_else(|| self.triggered_at.clone())
    }
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub user_id: String,
    pub password: String,
}

/// First unmet password rule, or `None` when the password is acceptable.
pub fn password_problem(password: &str) -> Option<&'static str> {
    if password.chars().count() < 8 {
        return Some("Password must be at least 8 characters long.");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Some("Password must contain at least one uppercase letter.");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Some("Password must contain at least one lowercase letter.");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Some("Password must contain at least one number.");
    }
    if !password.chars().any(|c| !c.is_ascii_alphanumeric()) {
        return Some("Password must contain at least one special character.");
    }
    None
}
