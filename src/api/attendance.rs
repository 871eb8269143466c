use crate::auth::auth::AuthUser;
use crate::error::AttendanceError;
use crate::model::check_in_record::CheckInRecord;
use crate::model::shift::ClockOutResult;
use crate::service::AttendanceService;
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceReq {
    #[schema(example = 3)]
    pub event_id: u64,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckInResponse {
    #[schema(example = true)]
    pub success: bool,
    pub record: CheckInRecord,
    #[schema(example = "Check-in successful")]
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct ClockOutWarning {
    #[schema(example = "remote_submission_failed")]
    pub error: String,
    #[schema(example = "Remote attendance submission failed: connection reset")]
    pub message: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClockOutResponse {
    #[schema(example = true)]
    pub success: bool,
    pub result: ClockOutResult,
    /// Set when the shift was closed locally but the remote API did not
    /// confirm it; the shift needs follow-up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<ClockOutWarning>,
    #[schema(example = "Clock-out successful")]
    pub message: String,
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    request_body = AttendanceReq,
    responses(
        (status = 200, description = "Checked in", body = CheckInResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No staff profile, or camera/location permission denied"),
        (status = 409, description = "Already checked in", body = Object, example = json!({
            "error": "already_checked_in",
            "message": "Staff 7 is already checked in to event 3 since 2025-01-01 09:00:00 UTC",
            "retryable": false
        })),
        (status = 422, description = "Capture or liveness failure"),
        (status = 502, description = "Remote attendance API rejected the check-in; nothing was staged"),
        (status = 503, description = "Verifier unavailable"),
        (status = 504, description = "Location fix timed out")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    service: web::Data<Arc<AttendanceService>>,
    payload: web::Json<AttendanceReq>,
) -> actix_web::Result<impl Responder> {
    let staff_id = auth.require_staff()?;
    tracing::debug!(user_id = auth.user_id, username = %auth.username, staff_id, "check-in requested");

    let outcome = service.check_in(staff_id, payload.event_id).await?;

    Ok(HttpResponse::Ok().json(CheckInResponse {
        success: true,
        record: outcome.record,
        message: outcome
            .message
            .unwrap_or_else(|| "Check-in successful".to_string()),
    }))
}

/// Clock-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/clock-out",
    request_body = AttendanceReq,
    responses(
        (status = 200, description = "Clocked out and confirmed remotely", body = ClockOutResponse),
        (status = 202, description = "Clocked out locally, remote submission failed", body = ClockOutResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No staff profile, or camera/location permission denied"),
        (status = 409, description = "No active check-in", body = Object, example = json!({
            "error": "no_active_check_in",
            "message": "No active check-in for staff 7 at event 3",
            "retryable": false
        })),
        (status = 422, description = "Capture failure or face mismatch"),
        (status = 503, description = "Verifier unavailable"),
        (status = 504, description = "Location fix timed out")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn clock_out(
    auth: AuthUser,
    service: web::Data<Arc<AttendanceService>>,
    payload: web::Json<AttendanceReq>,
) -> actix_web::Result<impl Responder> {
    let staff_id = auth.require_staff()?;
    tracing::debug!(user_id = auth.user_id, username = %auth.username, staff_id, "clock-out requested");

    let outcome = service.clock_out(staff_id, payload.event_id).await?;

    let (mut resp, message) = match &outcome.warning {
        None => (HttpResponse::Ok(), "Clock-out successful"),
        Some(_) => (
            HttpResponse::Accepted(),
            "Clocked out locally; the attendance server has not confirmed it yet",
        ),
    };

    Ok(resp.json(ClockOutResponse {
        success: true,
        result: outcome.result,
        warning: outcome.warning.as_ref().map(|w: &AttendanceError| ClockOutWarning {
            error: w.kind().to_string(),
            message: w.to_string(),
        }),
        message: message.to_string(),
    }))
}

/// Shift status for the caller at one event
#[utoipa::path(
    get,
    path = "/api/attendance/{event_id}/status",
    params(
        ("event_id", description = "Event ID")
    ),
    responses(
        (status = 200, body = crate::service::attendance::ShiftStatus),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No staff profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn shift_status(
    auth: AuthUser,
    service: web::Data<Arc<AttendanceService>>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let staff_id = auth.require_staff()?;
    let status = service.status(staff_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(status))
}
