use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::model::check_in_record::CheckInRecord;

const MS_PER_HOUR: i64 = 3_600_000;
const MS_PER_MINUTE: i64 = 60_000;

/// Whole hours plus remaining whole minutes. Partial minutes are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ShiftDuration {
    #[schema(example = 8)]
    pub hours: i64,

    #[schema(example = 30)]
    pub minutes: i64,
}

impl ShiftDuration {
    pub fn from_millis(ms: i64) -> Self {
        // clock skew can put clock-out before check-in
        let ms = ms.max(0);
        Self {
            hours: ms / MS_PER_HOUR,
            minutes: (ms % MS_PER_HOUR) / MS_PER_MINUTE,
        }
    }

    pub fn between(check_in: DateTime<Utc>, clock_out: DateTime<Utc>) -> Self {
        Self::from_millis((clock_out - check_in).num_milliseconds())
    }
}

/// Derived result of a clock-out. Not stored anywhere locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClockOutResult {
    #[schema(example = 7)]
    pub staff_id: u64,

    #[schema(example = 3)]
    pub event_id: u64,

    #[schema(value_type = String, format = "uuid")]
    pub shift_id: Uuid,

    #[schema(example = "2025-01-01T09:00:00Z", value_type = String, format = "date-time")]
    pub check_in_time: DateTime<Utc>,

    #[schema(example = "2025-01-01T17:30:00Z", value_type = String, format = "date-time")]
    pub clock_out_time: DateTime<Utc>,

    pub shift_duration: ShiftDuration,
}

impl ClockOutResult {
    pub fn close(record: &CheckInRecord, clock_out_time: DateTime<Utc>) -> Self {
        Self {
            staff_id: record.staff_id,
            event_id: record.event_id,
            shift_id: record.shift_id,
            check_in_time: record.check_in_time,
            clock_out_time,
            shift_duration: ShiftDuration::between(record.check_in_time, clock_out_time),
        }
    }
}
