use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn maps_url(&self) -> String {
        format!(
            "https://www.google.com/maps/search/?api=1&query={},{}",
            self.latitude, self.longitude
        )
    }
}

/// Why a position could not be obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationFault {
    #[error("Permission to access location was denied.")]
    PermissionDenied,
    #[error("Location information is unavailable.")]
    Unavailable,
    #[error("The request to get user location timed out.")]
    Timeout,
    #[error("Geolocation is not supported on this device.")]
    Unsupported,
    #[error("An unknown error occurred.")]
    Unknown,
}

impl LocationFault {
    /// Stable machine-readable code, carried by `PreconditionFailed`.
    pub fn reason_code(&self) -> &'static str {
        match self {
            LocationFault::PermissionDenied => "permission_denied",
            LocationFault::Unavailable => "position_unavailable",
            LocationFault::Timeout => "timeout",
            LocationFault::Unsupported => "unsupported",
            LocationFault::Unknown => "unknown",
        }
    }

    pub fn from_reason_code(code: &str) -> Option<Self> {
        [
            LocationFault::PermissionDenied,
            LocationFault::Unavailable,
            LocationFault::Timeout,
            LocationFault::Unsupported,
            LocationFault::Unknown,
        ]
        .into_iter()
        .find(|fault| fault.reason_code() == code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionStatus {
    Granted,
    Denied,
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// One-time permission prompt. Platforms without a prompt return `Granted`.
    async fn request_permission(&self) -> PermissionStatus;

    async fn current_position(&self) -> Result<Coordinates, LocationFault>;
}

/// Reports a configured position, optionally after a delay. Used by shells
/// with no positioning hardware.
#[derive(Debug, Clone)]
pub struct StaticLocationProvider {
    permission: PermissionStatus,
    position: Result<Coordinates, LocationFault>,
    delay: Duration,
}

impl StaticLocationProvider {
    pub fn new(position: Option<Coordinates>) -> Self {
        Self {
            permission: PermissionStatus::Granted,
            position: position.ok_or(LocationFault::Unavailable),
            delay: Duration::ZERO,
        }
    }

    pub fn failing(fault: LocationFault) -> Self {
        Self {
            permission: PermissionStatus::Granted,
            position: Err(fault),
            delay: Duration::ZERO,
        }
    }

    pub fn denied() -> Self {
        Self {
            permission: PermissionStatus::Denied,
            position: Err(LocationFault::PermissionDenied),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl LocationProvider for StaticLocationProvider {
    async fn request_permission(&self) -> PermissionStatus {
        self.permission
    }

    async fn current_position(&self) -> Result<Coordinates, LocationFault> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.position
    }
}
