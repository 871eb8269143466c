use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde_json::json;
use strum_macros::IntoStaticStr;

use crate::stage::StageError;

/// Every way a check-in or clock-out can fail.
///
/// Device and verification failures leave the shift state untouched, so the
/// caller may simply retry.
#[derive(Debug, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceError {
    #[display(fmt = "Camera unavailable: {}", _0)]
    CameraUnavailable(String),

    #[display(fmt = "Camera permission was denied")]
    CameraPermissionDenied,

    #[display(fmt = "Could not capture a frame: {}", _0)]
    CaptureFailed(String),

    #[display(fmt = "Location unavailable: {}", _0)]
    LocationUnavailable(String),

    #[display(fmt = "Location permission was denied")]
    LocationDenied,

    #[display(fmt = "Location fix timed out after {} ms", _0)]
    LocationTimeout(u64),

    #[display(fmt = "Liveness check failed, please face the camera and try again")]
    LivenessCheckFailed,

    #[display(fmt = "Face does not match the staff profile")]
    FaceMismatch,

    #[display(fmt = "Verification service unavailable: {}", _0)]
    VerificationUnavailable(String),

    #[display(
        fmt = "No active check-in for staff {} at event {}",
        staff_id,
        event_id
    )]
    NoActiveCheckIn { staff_id: u64, event_id: u64 },

    #[display(
        fmt = "Staff {} is already checked in to event {} since {}",
        staff_id,
        event_id,
        check_in_time
    )]
    AlreadyCheckedIn {
        staff_id: u64,
        event_id: u64,
        check_in_time: DateTime<Utc>,
    },

    #[display(fmt = "Remote attendance submission failed: {}", _0)]
    RemoteSubmissionFailed(String),

    #[display(fmt = "Local staging store error: {}", _0)]
    Storage(String),
}

impl std::error::Error for AttendanceError {}

impl AttendanceError {
    /// snake_case kind used in JSON error bodies and log fields
    pub fn kind(&self) -> &'static str {
        self.into()
    }

    /// Whether retrying the same action can succeed without operator help.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            AttendanceError::CameraPermissionDenied
                | AttendanceError::LocationDenied
                | AttendanceError::NoActiveCheckIn { .. }
                | AttendanceError::AlreadyCheckedIn { .. }
        )
    }
}

impl From<StageError> for AttendanceError {
    fn from(e: StageError) -> Self {
        AttendanceError::Storage(e.to_string())
    }
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::CameraPermissionDenied | AttendanceError::LocationDenied => {
                StatusCode::FORBIDDEN
            }
            AttendanceError::CameraUnavailable(_)
            | AttendanceError::CaptureFailed(_)
            | AttendanceError::LocationUnavailable(_)
            | AttendanceError::LivenessCheckFailed
            | AttendanceError::FaceMismatch => StatusCode::UNPROCESSABLE_ENTITY,
            AttendanceError::LocationTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AttendanceError::VerificationUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AttendanceError::RemoteSubmissionFailed(_) => StatusCode::BAD_GATEWAY,
            AttendanceError::NoActiveCheckIn { .. } | AttendanceError::AlreadyCheckedIn { .. } => {
                StatusCode::CONFLICT
            }
            AttendanceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.kind(),
            "message": self.to_string(),
            "retryable": self.is_retryable(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_snake_case() {
        assert_eq!(AttendanceError::FaceMismatch.kind(), "face_mismatch");
        assert_eq!(
            AttendanceError::NoActiveCheckIn {
                staff_id: 1,
                event_id: 2
            }
            .kind(),
            "no_active_check_in"
        );
        assert_eq!(AttendanceError::LocationTimeout(10).kind(), "location_timeout");
    }

    #[test]
    fn verifier_outage_is_not_a_mismatch() {
        let outage = AttendanceError::VerificationUnavailable("connection refused".into());
        assert_ne!(outage.kind(), AttendanceError::FaceMismatch.kind());
        assert_eq!(outage.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            AttendanceError::FaceMismatch.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn permission_denials_are_not_retryable() {
        assert!(!AttendanceError::CameraPermissionDenied.is_retryable());
        assert!(!AttendanceError::LocationDenied.is_retryable());
        assert!(AttendanceError::LocationTimeout(5_000).is_retryable());
        assert!(AttendanceError::RemoteSubmissionFailed("503".into()).is_retryable());
    }
}
