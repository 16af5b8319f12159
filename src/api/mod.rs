pub mod client;
pub mod error;
pub mod models;

use async_trait::async_trait;

pub use client::ApiClient;
pub use error::ApiError;
pub use models::{
    password_problem, EmergencyEvent, EmergencyReport, EventStatus, Registration,
};

/// Delivers a confirmed emergency report. At most one call per confirmed hold.
#[async_trait]
pub trait EmergencySubmitter: Send + Sync {
    async fn submit(&self, report: &EmergencyReport) -> Result<(), ApiError>;
}

/// Read-only history of a user's reports, newest ordering as the server sends it.
#[async_trait]
pub trait EventHistory: Send + Sync {
    async fn list_events(&self, user_id: &str) -> Result<Vec<EmergencyEvent>, ApiError>;
}
