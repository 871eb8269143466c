//! Deterministic stand-ins for devices, verifier, remote API and time.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use actix_web::{App, HttpServer, web};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::device::{CameraStream, DeviceCapture, FacingMode, StreamProbe};
use crate::error::AttendanceError;
use crate::model::check_in_record::{CapturedImage, Coordinates};
use crate::remote::{
    AttendanceSubmission, BroadcastAck, CheckInAck, ClockOutAck, RemoteAttendance, RemoteError,
};
use crate::service::clock::Clock;
use crate::verification::Verifier;

pub fn image(face: &str) -> CapturedImage {
    CapturedImage {
        width: 640,
        height: 480,
        mime: "image/jpeg".to_string(),
        data: face.to_string(),
    }
}

/// Serves `configure` on an ephemeral local port and returns its base url.
pub async fn spawn_stub<F>(configure: F) -> String
where
    F: Fn(&mut web::ServiceConfig) + Clone + Send + 'static,
{
    let server = HttpServer::new(move || App::new().configure(configure.clone()))
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    format!("http://{addr}")
}

pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn at(ts: &str) -> Self {
        Self(Mutex::new(ts.parse().unwrap()))
    }

    pub fn set(&self, ts: &str) {
        *self.0.lock().unwrap() = ts.parse().unwrap();
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

pub struct FakeDevice {
    face: Mutex<String>,
    camera_error: Mutex<Option<AttendanceError>>,
    location_error: Mutex<Option<AttendanceError>>,
    probes: Mutex<Vec<StreamProbe>>,
}

impl Default for FakeDevice {
    fn default() -> Self {
        Self {
            face: Mutex::new("face-7".to_string()),
            camera_error: Mutex::new(None),
            location_error: Mutex::new(None),
            probes: Mutex::new(Vec::new()),
        }
    }
}

impl FakeDevice {
    pub fn set_face(&self, face: &str) {
        *self.face.lock().unwrap() = face.to_string();
    }

    pub fn fail_camera(&self, e: AttendanceError) {
        *self.camera_error.lock().unwrap() = Some(e);
    }

    pub fn fail_location(&self, e: AttendanceError) {
        *self.location_error.lock().unwrap() = Some(e);
    }

    pub fn streams_opened(&self) -> usize {
        self.probes.lock().unwrap().len()
    }

    pub fn live_streams(&self) -> usize {
        self.probes
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.is_live())
            .count()
    }
}

// the scripted errors are replayed on every call
fn replay(e: &AttendanceError) -> AttendanceError {
    match e {
        AttendanceError::CameraUnavailable(m) => AttendanceError::CameraUnavailable(m.clone()),
        AttendanceError::CameraPermissionDenied => AttendanceError::CameraPermissionDenied,
        AttendanceError::CaptureFailed(m) => AttendanceError::CaptureFailed(m.clone()),
        AttendanceError::LocationUnavailable(m) => AttendanceError::LocationUnavailable(m.clone()),
        AttendanceError::LocationDenied => AttendanceError::LocationDenied,
        AttendanceError::LocationTimeout(ms) => AttendanceError::LocationTimeout(*ms),
        other => AttendanceError::CaptureFailed(other.to_string()),
    }
}

#[async_trait]
impl DeviceCapture for FakeDevice {
    async fn acquire_camera(&self, facing: FacingMode) -> Result<CameraStream, AttendanceError> {
        if let Some(e) = self.camera_error.lock().unwrap().as_ref() {
            return Err(replay(e));
        }
        let stream = CameraStream::open(facing, 640, 480);
        self.probes.lock().unwrap().push(stream.probe());
        Ok(stream)
    }

    fn capture_frame(&self, stream: &CameraStream) -> Result<CapturedImage, AttendanceError> {
        if !stream.has_video() {
            return Err(AttendanceError::CaptureFailed("stream stopped".into()));
        }
        Ok(image(&self.face.lock().unwrap()))
    }

    async fn acquire_location(&self, _timeout: Duration) -> Result<Coordinates, AttendanceError> {
        if let Some(e) = self.location_error.lock().unwrap().as_ref() {
            return Err(replay(e));
        }
        Ok(Coordinates::new(23.8103, 90.4125))
    }
}

/// Liveness answers are scripted; a match is "same image payload".
pub struct FakeVerifier {
    live: Mutex<Result<bool, String>>,
    calls: AtomicUsize,
}

impl Default for FakeVerifier {
    fn default() -> Self {
        Self {
            live: Mutex::new(Ok(true)),
            calls: AtomicUsize::new(0),
        }
    }
}

impl FakeVerifier {
    pub fn set_live(&self, answer: Result<bool, String>) {
        *self.live.lock().unwrap() = answer;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Verifier for FakeVerifier {
    async fn verify_liveness(&self, _image: &CapturedImage) -> Result<bool, AttendanceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.live
            .lock()
            .unwrap()
            .clone()
            .map_err(AttendanceError::VerificationUnavailable)
    }

    async fn verify_match(
        &self,
        image: &CapturedImage,
        reference: &CapturedImage,
    ) -> Result<bool, AttendanceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // let a concurrent flow run between the precheck and consume
        tokio::task::yield_now().await;
        Ok(image.data == reference.data)
    }
}

#[derive(Default)]
pub struct FakeRemote {
    profiles: Mutex<HashMap<u64, String>>,
    fail_check_in: AtomicBool,
    fail_clock_out: AtomicBool,
    check_ins: AtomicUsize,
    clock_outs: AtomicUsize,
    profile_fetches: AtomicUsize,
    broadcasts: Mutex<Vec<(u64, String)>>,
    delay: Mutex<Duration>,
}

impl FakeRemote {
    pub fn set_profile(&self, staff_id: u64, face: &str) {
        self.profiles
            .lock()
            .unwrap()
            .insert(staff_id, face.to_string());
    }

    pub fn clear_profiles(&self) {
        self.profiles.lock().unwrap().clear();
    }

    /// Latency of every check-in and clock-out submission.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    async fn latency(&self) {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn fail_check_in(&self, fail: bool) {
        self.fail_check_in.store(fail, Ordering::SeqCst);
    }

    pub fn fail_clock_out(&self, fail: bool) {
        self.fail_clock_out.store(fail, Ordering::SeqCst);
    }

    pub fn check_ins(&self) -> usize {
        self.check_ins.load(Ordering::SeqCst)
    }

    pub fn clock_outs(&self) -> usize {
        self.clock_outs.load(Ordering::SeqCst)
    }

    pub fn profile_fetches(&self) -> usize {
        self.profile_fetches.load(Ordering::SeqCst)
    }

    pub fn broadcasts(&self) -> Vec<(u64, String)> {
        self.broadcasts.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteAttendance for FakeRemote {
    async fn submit_check_in(&self, _body: &AttendanceSubmission) -> Result<CheckInAck, RemoteError> {
        self.latency().await;
        if self.fail_check_in.load(Ordering::SeqCst) {
            return Err(RemoteError("503 Service Unavailable".into()));
        }
        self.check_ins.fetch_add(1, Ordering::SeqCst);
        Ok(CheckInAck {
            success: true,
            check_in_time: None,
            message: Some("Check-in successful".into()),
        })
    }

    async fn submit_clock_out(
        &self,
        _body: &AttendanceSubmission,
    ) -> Result<ClockOutAck, RemoteError> {
        self.latency().await;
        if self.fail_clock_out.load(Ordering::SeqCst) {
            return Err(RemoteError("connection reset".into()));
        }
        self.clock_outs.fetch_add(1, Ordering::SeqCst);
        Ok(ClockOutAck {
            success: true,
            clock_out_time: None,
            shift_duration: None,
            message: Some("Clock-out successful".into()),
        })
    }

    async fn profile_image(&self, staff_id: u64) -> Result<CapturedImage, RemoteError> {
        self.profile_fetches.fetch_add(1, Ordering::SeqCst);
        self.profiles
            .lock()
            .unwrap()
            .get(&staff_id)
            .map(|face| image(face))
            .ok_or_else(|| RemoteError(format!("no profile for staff {staff_id}")))
    }

    async fn broadcast(&self, event_id: u64, message: &str) -> Result<BroadcastAck, RemoteError> {
        self.broadcasts
            .lock()
            .unwrap()
            .push((event_id, message.to_string()));
        Ok(BroadcastAck {
            success: true,
            staff_count: 5,
            message: format!("Message sent to 5 staff for event {event_id}"),
        })
    }
}
