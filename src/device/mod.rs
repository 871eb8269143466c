//! Camera and geolocation access behind one async seam.

mod simulated;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

use crate::error::AttendanceError;
use crate::model::check_in_record::{CapturedImage, Coordinates};

pub use simulated::{DeviceSettings, SimulatedDevice};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FacingMode {
    /// front camera
    User,
    /// rear camera
    Environment,
}

/// Shared view of whether a stream still holds the device.
#[derive(Debug, Clone)]
pub struct StreamProbe(Arc<AtomicBool>);

impl StreamProbe {
    pub fn is_live(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns `true` only for the call that actually stopped the stream.
    pub fn stop(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// A live video stream. Dropping it releases the device, so every exit path
/// out of a capture flow gives the camera back.
#[derive(Debug)]
pub struct CameraStream {
    pub id: Uuid,
    pub facing: FacingMode,
    pub width: u32,
    pub height: u32,
    live: StreamProbe,
}

impl CameraStream {
    pub fn open(facing: FacingMode, width: u32, height: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            facing,
            width,
            height,
            live: StreamProbe(Arc::new(AtomicBool::new(true))),
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.is_live()
    }

    pub fn probe(&self) -> StreamProbe {
        self.live.clone()
    }

    pub fn has_video(&self) -> bool {
        self.is_live() && self.width > 0 && self.height > 0
    }
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        if self.live.stop() {
            tracing::debug!(stream_id = %self.id, facing = %self.facing, "camera stream released on drop");
        }
    }
}

#[async_trait]
pub trait DeviceCapture: Send + Sync + 'static {
    /// Opens a stream on the requested camera, stopping any stream this
    /// adapter still holds.
    async fn acquire_camera(&self, facing: FacingMode) -> Result<CameraStream, AttendanceError>;

    /// Samples the current frame into a still image.
    fn capture_frame(&self, stream: &CameraStream) -> Result<CapturedImage, AttendanceError>;

    /// One-shot high-accuracy fix, bounded by `timeout`.
    async fn acquire_location(&self, timeout: Duration) -> Result<Coordinates, AttendanceError>;

    /// Stops the stream. Safe to call on a stream that is already stopped.
    fn release(&self, stream: &CameraStream) {
        if stream.live.stop() {
            tracing::debug!(stream_id = %stream.id, "camera stream released");
        }
    }
}
