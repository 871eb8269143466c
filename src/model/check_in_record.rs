use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A single geolocation fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    #[schema(example = 23.8103)]
    pub latitude: f64,

    #[schema(example = 90.4125)]
    pub longitude: f64,

    /// Reported accuracy radius in metres, when the device provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = 12.5, nullable = true)]
    pub accuracy: Option<f64>,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Still frame sampled from a camera stream.
///
/// Only lives for the duration of the call that produced it; it is never
/// written into the staging slot.
#[derive(Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub width: u32,
    pub height: u32,
    pub mime: String,
    /// base64 payload, without the data-url prefix
    pub data: String,
}

impl CapturedImage {
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.data)
    }

    /// Parses `data:<mime>;base64,<payload>`. Dimensions are unknown for
    /// images that arrive this way and are reported as zero.
    pub fn from_data_url(url: &str) -> Option<Self> {
        let rest = url.strip_prefix("data:")?;
        let (mime, data) = rest.split_once(";base64,")?;
        if mime.is_empty() || data.is_empty() {
            return None;
        }
        Some(Self {
            width: 0,
            height: 0,
            mime: mime.to_string(),
            data: data.to_string(),
        })
    }
}

// payloads are large, keep them out of logs
impl std::fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("mime", &self.mime)
            .field("bytes_b64", &self.data.len())
            .finish()
    }
}

/// The in-flight check-in held in the staging slot between check-in and
/// clock-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRecord {
    #[schema(example = 7)]
    pub staff_id: u64,

    #[schema(example = 3)]
    pub event_id: u64,

    #[schema(value_type = String, format = "uuid")]
    pub shift_id: Uuid,

    #[schema(example = "2025-01-01T09:00:00Z", value_type = String, format = "date-time")]
    pub check_in_time: DateTime<Utc>,

    pub location: Coordinates,
}

impl CheckInRecord {
    pub fn new(
        staff_id: u64,
        event_id: u64,
        check_in_time: DateTime<Utc>,
        location: Coordinates,
    ) -> Self {
        Self {
            staff_id,
            event_id,
            shift_id: Uuid::new_v4(),
            check_in_time,
            location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_range_check() {
        assert!(Coordinates::new(23.81, 90.41).is_valid());
        assert!(Coordinates::new(-90.0, 180.0).is_valid());
        assert!(!Coordinates::new(91.0, 0.0).is_valid());
        assert!(!Coordinates::new(0.0, -180.5).is_valid());
        assert!(!Coordinates::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn data_url_parsing() {
        let img = CapturedImage::from_data_url("data:image/jpeg;base64,QUJD").unwrap();
        assert_eq!(img.mime, "image/jpeg");
        assert_eq!(img.data, "QUJD");
        assert_eq!(img.to_data_url(), "data:image/jpeg;base64,QUJD");

        assert!(CapturedImage::from_data_url("image/jpeg;base64,QUJD").is_none());
        assert!(CapturedImage::from_data_url("data:image/jpeg;base64,").is_none());
    }

    #[test]
    fn staged_record_uses_camel_case_and_iso_timestamps() {
        let at = "2025-01-01T09:00:00Z".parse().unwrap();
        let record = CheckInRecord::new(7, 3, at, Coordinates::new(1.0, 2.0));
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["staffId"], 7);
        assert_eq!(json["eventId"], 3);
        assert_eq!(json["checkInTime"], "2025-01-01T09:00:00Z");
        assert!(json["location"].get("accuracy").is_none());
    }
}
