use crate::auth::auth::AuthUser;
use crate::service::AttendanceService;
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastReq {
    /// May contain placeholders such as `{name}`; they are filled in by the
    /// attendance server for each recipient.
    #[schema(example = "Hi {name}, doors open at 18:00 for {event}.")]
    pub message_content: String,
}

/// Relay a message to every staff member assigned to the event
#[utoipa::path(
    post,
    path = "/api/events/{event_id}/broadcast",
    request_body = BroadcastReq,
    params(
        ("event_id", description = "Event ID")
    ),
    responses(
        (status = 200, description = "Message relayed", body = crate::remote::BroadcastAck),
        (status = 400, description = "Empty message"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Organizer/Admin only"),
        (status = 502, description = "Attendance server rejected the broadcast")
    ),
    security(("bearer_auth" = [])),
    tag = "Events"
)]
pub async fn broadcast(
    auth: AuthUser,
    service: web::Data<Arc<AttendanceService>>,
    path: web::Path<u64>,
    payload: web::Json<BroadcastReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_organizer_or_admin()?;

    let message = payload.message_content.trim();
    if message.is_empty() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "messageContent must not be empty"
        })));
    }

    let event_id = path.into_inner();
    let ack = service.broadcast(event_id, message).await?;
    tracing::info!(event_id, staff_count = ack.staff_count, user_id = auth.user_id, "Broadcast relayed");

    Ok(HttpResponse::Ok().json(ack))
}
