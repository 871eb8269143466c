//! Client side of the remote attendance API.

mod http;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::check_in_record::{CapturedImage, Coordinates};
use crate::model::shift::ShiftDuration;

pub use http::HttpRemote;

#[derive(Debug, Display, Clone, PartialEq, Eq)]
#[display(fmt = "{}", _0)]
pub struct RemoteError(pub String);

impl std::error::Error for RemoteError {}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<Coordinates> for LatLng {
    fn from(c: Coordinates) -> Self {
        Self {
            latitude: c.latitude,
            longitude: c.longitude,
        }
    }
}

/// Body of `POST /attendance/check-in` and `POST /attendance/clock-out`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSubmission {
    pub staff_id: u64,
    pub event_id: u64,
    /// data url of the captured frame
    pub image: String,
    pub location: LatLng,
}

impl AttendanceSubmission {
    pub fn new(staff_id: u64, event_id: u64, image: &CapturedImage, location: Coordinates) -> Self {
        Self {
            staff_id,
            event_id,
            image: image.to_data_url(),
            location: location.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInAck {
    pub success: bool,
    #[serde(default)]
    pub check_in_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockOutAck {
    pub success: bool,
    #[serde(default)]
    pub clock_out_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub shift_duration: Option<ShiftDuration>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastAck {
    pub success: bool,
    #[schema(example = 12)]
    pub staff_count: u64,
    #[schema(example = "Message sent to 12 staff members")]
    pub message: String,
}

#[async_trait]
pub trait RemoteAttendance: Send + Sync + 'static {
    async fn submit_check_in(&self, body: &AttendanceSubmission) -> Result<CheckInAck, RemoteError>;

    async fn submit_clock_out(
        &self,
        body: &AttendanceSubmission,
    ) -> Result<ClockOutAck, RemoteError>;

    /// Reference image the staff member enrolled with.
    async fn profile_image(&self, staff_id: u64) -> Result<CapturedImage, RemoteError>;

    /// Relays an organizer message to every staff member of the event.
    /// Placeholders in the message are filled in remotely.
    async fn broadcast(&self, event_id: u64, message: &str) -> Result<BroadcastAck, RemoteError>;
}
