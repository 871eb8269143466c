use crate::api::attendance::{AttendanceReq, CheckInResponse, ClockOutResponse, ClockOutWarning};
use crate::api::broadcast::BroadcastReq;
use crate::model::attendance_state::AttendanceState;
use crate::model::check_in_record::{CheckInRecord, Coordinates};
use crate::model::shift::{ClockOutResult, ShiftDuration};
use crate::remote::BroadcastAck;
use crate::service::attendance::ShiftStatus;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Staff Attendance Agent API",
        version = "1.0.0",
        description = r#"
## Event Staff Attendance

Local API of the staff portal agent. The agent owns the camera and location
devices of the check-in kiosk, keeps the in-flight check-in of every staff
member in a durable local slot, and forwards attendance to the event-staffing
server.

### 🔹 Key Features
- **Check-in**
  - Camera frame + location + liveness verification, then remote submission
- **Clock-out**
  - Face match against the staff profile, shift duration in whole hours and minutes
- **Shift status**
  - Not checked in / checked in / clocked out, surviving agent restarts
- **Broadcast**
  - Organizers relay a message to all staff of an event

### 🔐 Security
Every endpoint expects a **JWT Bearer** access token from the identity service.
Attendance endpoints need a token linked to a staff profile.

### ⚠️ Errors
Errors are JSON `{ "error": "<kind>", "message": "...", "retryable": bool }`.
A clock-out that the server did not confirm returns **202** with a `warning`.

---
Built with **Rust**, **Actix Web**, **SQLx** and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::clock_out,
        crate::api::attendance::shift_status,

        crate::api::broadcast::broadcast
    ),
    components(
        schemas(
            AttendanceReq,
            CheckInResponse,
            ClockOutResponse,
            ClockOutWarning,
            CheckInRecord,
            Coordinates,
            ClockOutResult,
            ShiftDuration,
            ShiftStatus,
            AttendanceState,
            BroadcastReq,
            BroadcastAck
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Check-in / clock-out APIs"),
        (name = "Events", description = "Event messaging APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
