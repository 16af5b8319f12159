use serde::Serialize;
use thiserror::Error;

use crate::location::LocationFault;

use super::TriggerPhase;

/// Why a hold was refused or an attempt ended without a report. Every
/// variant leaves the controller back in `Idle`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum TriggerError {
    #[error("Cannot trigger emergency. Waiting for location or resolving error.")]
    PreconditionPending,
    #[error("Cannot send emergency: {}", describe_reason(.0))]
    PreconditionFailed(String),
    #[error("User not logged in.")]
    NotAuthenticated,
    #[error("Emergency trigger is busy ({0}).")]
    Busy(TriggerPhase),
    #[error("{0}")]
    SubmissionFailed(String),
}

fn describe_reason(code: &str) -> String {
    LocationFault::from_reason_code(code)
        .map(|fault| fault.to_string())
        .unwrap_or_else(|| code.to_string())
}

impl From<LocationFault> for TriggerError {
    fn from(fault: LocationFault) -> Self {
        TriggerError::PreconditionFailed(fault.reason_code().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_precondition_reads_as_fault_text() {
        let err = TriggerError::from(LocationFault::PermissionDenied);
        assert_eq!(err, TriggerError::PreconditionFailed("permission_denied".into()));
        assert_eq!(
            err.to_string(),
            "Cannot send emergency: Permission to access location was denied."
        );
    }

    #[test]
    fn unknown_reason_code_is_shown_as_is() {
        let err = TriggerError::PreconditionFailed("gps_jammed".into());
        assert_eq!(err.to_string(), "Cannot send emergency: gps_jammed");
    }
}
