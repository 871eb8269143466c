use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use utoipa::ToSchema;

/// Where a (staff, event) pair sits in the shift lifecycle.
///
/// `ClockedOut` is terminal for one shift instance. A new check-in starts a
/// fresh shift from `NotCheckedIn`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceState {
    NotCheckedIn,
    CheckedIn,
    ClockedOut,
}
