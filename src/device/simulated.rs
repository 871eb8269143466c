use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::{CameraStream, DeviceCapture, FacingMode, StreamProbe};
use crate::error::AttendanceError;
use crate::model::check_in_record::{CapturedImage, Coordinates};

#[derive(Debug, Clone)]
pub struct DeviceSettings {
    pub camera_available: bool,
    pub camera_permission: bool,
    pub frame_width: u32,
    pub frame_height: u32,
    /// Still image served as every captured frame. A generated test pattern
    /// is used when unset.
    pub frame_path: Option<PathBuf>,
    pub location: Option<Coordinates>,
    pub location_permission: bool,
    /// Latency of the simulated position fix.
    pub fix_delay: Duration,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            camera_available: true,
            camera_permission: true,
            frame_width: 640,
            frame_height: 480,
            frame_path: None,
            location: None,
            location_permission: true,
            fix_delay: Duration::from_millis(250),
        }
    }
}

/// Device adapter for kiosks without native capture bindings. Frames come
/// from a still image or a test pattern, positions from configuration.
pub struct SimulatedDevice {
    settings: DeviceSettings,
    frame: Option<(String, Vec<u8>)>,
    held: Mutex<Option<StreamProbe>>,
    captured: AtomicU64,
}

impl SimulatedDevice {
    pub fn new(settings: DeviceSettings) -> Self {
        Self {
            settings,
            frame: None,
            held: Mutex::new(None),
            captured: AtomicU64::new(0),
        }
    }

    /// Builds the adapter, reading the configured still frame up front so
    /// that frame capture stays synchronous.
    pub async fn load(settings: DeviceSettings) -> anyhow::Result<Self> {
        let frame = match &settings.frame_path {
            Some(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .with_context(|| format!("Failed to read camera frame {}", path.display()))?;
                Some((mime_for(path).to_string(), bytes))
            }
            None => None,
        };

        Ok(Self {
            frame,
            ..Self::new(settings)
        })
    }

    fn test_pattern(&self, width: u32, height: u32) -> Vec<u8> {
        // shifts a little on every capture so consecutive frames differ
        let tick = self.captured.fetch_add(1, Ordering::Relaxed);
        let header = format!("P6\n{width} {height}\n255\n");
        let mut out = Vec::with_capacity(header.len() + (width * height * 3) as usize);
        out.extend_from_slice(header.as_bytes());

        for y in 0..height {
            for x in 0..width {
                out.push(((x * 255) / width.max(1)) as u8);
                out.push(((y * 255) / height.max(1)) as u8);
                out.push((tick.wrapping_mul(37) % 256) as u8);
            }
        }
        out
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("ppm") => "image/x-portable-pixmap",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl DeviceCapture for SimulatedDevice {
    async fn acquire_camera(&self, facing: FacingMode) -> Result<CameraStream, AttendanceError> {
        let previous = self
            .held
            .lock()
            .map_err(|_| AttendanceError::CameraUnavailable("device state poisoned".into()))?
            .take();
        if let Some(previous) = previous {
            if previous.stop() {
                tracing::debug!("released previously held camera stream");
            }
        }

        if !self.settings.camera_permission {
            return Err(AttendanceError::CameraPermissionDenied);
        }
        if !self.settings.camera_available {
            return Err(AttendanceError::CameraUnavailable(
                "no video input device".to_string(),
            ));
        }

        let stream = CameraStream::open(
            facing,
            self.settings.frame_width,
            self.settings.frame_height,
        );
        if let Ok(mut held) = self.held.lock() {
            *held = Some(stream.probe());
        }
        tracing::debug!(stream_id = %stream.id, facing = %stream.facing, "camera stream acquired");
        Ok(stream)
    }

    fn capture_frame(&self, stream: &CameraStream) -> Result<CapturedImage, AttendanceError> {
        if !stream.has_video() {
            return Err(AttendanceError::CaptureFailed(
                "stream has no active video dimensions".to_string(),
            ));
        }

        let (mime, bytes) = match &self.frame {
            Some((mime, bytes)) => (mime.clone(), bytes.clone()),
            None => (
                "image/x-portable-pixmap".to_string(),
                self.test_pattern(stream.width, stream.height),
            ),
        };

        Ok(CapturedImage {
            width: stream.width,
            height: stream.height,
            mime,
            data: STANDARD.encode(bytes),
        })
    }

    async fn acquire_location(&self, timeout: Duration) -> Result<Coordinates, AttendanceError> {
        if !self.settings.location_permission {
            return Err(AttendanceError::LocationDenied);
        }

        let fix = async {
            tokio::time::sleep(self.settings.fix_delay).await;
            self.settings.location
        };

        match tokio::time::timeout(timeout, fix).await {
            Err(_) => Err(AttendanceError::LocationTimeout(timeout.as_millis() as u64)),
            Ok(None) => Err(AttendanceError::LocationUnavailable(
                "no position source configured".to_string(),
            )),
            Ok(Some(c)) if !c.is_valid() => Err(AttendanceError::LocationUnavailable(format!(
                "position out of range ({}, {})",
                c.latitude, c.longitude
            ))),
            Ok(Some(c)) => Ok(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn located() -> DeviceSettings {
        DeviceSettings {
            location: Some(Coordinates::new(23.81, 90.41)),
            fix_delay: Duration::from_millis(1),
            ..DeviceSettings::default()
        }
    }

    #[actix_web::test]
    async fn new_stream_stops_the_previous_one() {
        let device = SimulatedDevice::new(located());
        let first = device.acquire_camera(FacingMode::User).await.unwrap();
        let second = device.acquire_camera(FacingMode::Environment).await.unwrap();

        assert!(!first.is_live());
        assert!(second.is_live());
    }

    #[actix_web::test]
    async fn capture_fails_after_release() {
        let device = SimulatedDevice::new(located());
        let stream = device.acquire_camera(FacingMode::User).await.unwrap();
        let frame = device.capture_frame(&stream).unwrap();
        assert_eq!(frame.mime, "image/x-portable-pixmap");
        assert_eq!((frame.width, frame.height), (640, 480));

        device.release(&stream);
        device.release(&stream);
        assert!(matches!(
            device.capture_frame(&stream),
            Err(AttendanceError::CaptureFailed(_))
        ));
    }

    #[actix_web::test]
    async fn zero_sized_stream_cannot_capture() {
        let device = SimulatedDevice::new(DeviceSettings {
            frame_width: 0,
            ..located()
        });
        let stream = device.acquire_camera(FacingMode::User).await.unwrap();
        assert!(matches!(
            device.capture_frame(&stream),
            Err(AttendanceError::CaptureFailed(_))
        ));
    }

    #[actix_web::test]
    async fn permission_denial_is_its_own_kind() {
        let device = SimulatedDevice::new(DeviceSettings {
            camera_permission: false,
            location_permission: false,
            ..located()
        });
        assert!(matches!(
            device.acquire_camera(FacingMode::User).await,
            Err(AttendanceError::CameraPermissionDenied)
        ));
        assert!(matches!(
            device.acquire_location(Duration::from_secs(1)).await,
            Err(AttendanceError::LocationDenied)
        ));

        let device = SimulatedDevice::new(DeviceSettings {
            camera_available: false,
            ..located()
        });
        assert!(matches!(
            device.acquire_camera(FacingMode::User).await,
            Err(AttendanceError::CameraUnavailable(_))
        ));
    }

    #[actix_web::test]
    async fn slow_fix_times_out() {
        let device = SimulatedDevice::new(DeviceSettings {
            fix_delay: Duration::from_millis(500),
            ..located()
        });
        assert!(matches!(
            device.acquire_location(Duration::from_millis(20)).await,
            Err(AttendanceError::LocationTimeout(20))
        ));
    }

    #[actix_web::test]
    async fn missing_or_bogus_position_is_unavailable() {
        let device = SimulatedDevice::new(DeviceSettings {
            location: None,
            ..located()
        });
        assert!(matches!(
            device.acquire_location(Duration::from_secs(1)).await,
            Err(AttendanceError::LocationUnavailable(_))
        ));

        let device = SimulatedDevice::new(DeviceSettings {
            location: Some(Coordinates::new(120.0, 0.0)),
            ..located()
        });
        assert!(matches!(
            device.acquire_location(Duration::from_secs(1)).await,
            Err(AttendanceError::LocationUnavailable(_))
        ));
    }

    #[actix_web::test]
    async fn still_frame_file_is_served_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face.jpg");
        std::fs::write(&path, b"not-really-a-jpeg").unwrap();

        let device = SimulatedDevice::load(DeviceSettings {
            frame_path: Some(path),
            ..located()
        })
        .await
        .unwrap();
        let stream = device.acquire_camera(FacingMode::User).await.unwrap();
        let frame = device.capture_frame(&stream).unwrap();

        assert_eq!(frame.mime, "image/jpeg");
        assert_eq!(frame.data, STANDARD.encode(b"not-really-a-jpeg"));
    }
}
