use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::Serialize;
use tracing::{Instrument, Span, info, instrument, warn};
use utoipa::ToSchema;

use super::clock::Clock;
use super::key_lock::KeyLocks;
use crate::device::{DeviceCapture, FacingMode};
use crate::error::AttendanceError;
use crate::model::attendance_state::AttendanceState;
use crate::model::check_in_record::{CapturedImage, CheckInRecord, Coordinates};
use crate::model::shift::ClockOutResult;
use crate::remote::{AttendanceSubmission, RemoteAttendance};
use crate::stage::{SessionStage, StageError};
use crate::utils::profile_cache::ProfileImageCache;
use crate::verification::Verifier;

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub facing: FacingMode,
    pub location_timeout: Duration,
    pub profile_ttl: Duration,
    /// How long a finished shift is still reported as `ClockedOut`.
    pub closed_ttl: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            facing: FacingMode::User,
            location_timeout: Duration::from_secs(10),
            profile_ttl: Duration::from_secs(3600),
            closed_ttl: Duration::from_secs(12 * 3600),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckInOutcome {
    pub record: CheckInRecord,
    pub message: Option<String>,
}

/// A finished clock-out. `warning` is set when the remote API did not
/// acknowledge the shift; the local shift is closed either way.
#[derive(Debug)]
pub struct ClockOutOutcome {
    pub result: ClockOutResult,
    pub warning: Option<AttendanceError>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShiftStatus {
    pub state: AttendanceState,
    pub check_in: Option<CheckInRecord>,
    pub last_clock_out: Option<ClockOutResult>,
}

/// Drives check-in and clock-out for every (staff, event) pair.
///
/// Each flow runs its steps strictly in order: camera, frame, location,
/// verification, staging, remote submission. Nothing is staged until the
/// remote API has accepted the check-in, and a clock-out consumes its staged
/// record exactly once.
///
/// Remote submissions run on their own task. A caller that goes away (a
/// closed browser tab, a dropped request) does not cancel them; the result
/// is just not delivered.
pub struct AttendanceService {
    device: Arc<dyn DeviceCapture>,
    verifier: Arc<dyn Verifier>,
    remote: Arc<dyn RemoteAttendance>,
    stage: SessionStage,
    clock: Arc<dyn Clock>,
    profiles: ProfileImageCache,
    closed: Cache<(u64, u64), ClockOutResult>,
    check_in_locks: KeyLocks,
    settings: ServiceSettings,
}

impl AttendanceService {
    pub fn new(
        device: Arc<dyn DeviceCapture>,
        verifier: Arc<dyn Verifier>,
        remote: Arc<dyn RemoteAttendance>,
        stage: SessionStage,
        clock: Arc<dyn Clock>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            device,
            verifier,
            remote,
            stage,
            clock,
            profiles: ProfileImageCache::new(settings.profile_ttl),
            closed: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(settings.closed_ttl)
                .build(),
            check_in_locks: KeyLocks::new(),
            settings,
        }
    }

    #[instrument(name = "attendance_check_in", skip(self))]
    pub async fn check_in(
        &self,
        staff_id: u64,
        event_id: u64,
    ) -> Result<CheckInOutcome, AttendanceError> {
        let outcome = self.run_check_in(staff_id, event_id).await;
        match &outcome {
            Ok(o) => info!(
                shift_id = %o.record.shift_id,
                check_in_time = %o.record.check_in_time,
                "Checked in"
            ),
            Err(e) => warn!(error = %e, kind = e.kind(), "Check-in aborted"),
        }
        outcome
    }

    #[instrument(name = "attendance_clock_out", skip(self))]
    pub async fn clock_out(
        &self,
        staff_id: u64,
        event_id: u64,
    ) -> Result<ClockOutOutcome, AttendanceError> {
        let outcome = self.run_clock_out(staff_id, event_id).await;
        match &outcome {
            Ok(o) => info!(
                shift_id = %o.result.shift_id,
                hours = o.result.shift_duration.hours,
                minutes = o.result.shift_duration.minutes,
                remote_confirmed = o.warning.is_none(),
                "Clocked out"
            ),
            Err(e) => warn!(error = %e, kind = e.kind(), "Clock-out aborted"),
        }
        outcome
    }

    pub async fn status(&self, staff_id: u64, event_id: u64) -> Result<ShiftStatus, AttendanceError> {
        let check_in = self.stage.peek(staff_id, event_id).await?;
        let last_clock_out = self.closed.get(&(staff_id, event_id)).await;

        let state = match (&check_in, &last_clock_out) {
            (Some(_), _) => AttendanceState::CheckedIn,
            (None, Some(_)) => AttendanceState::ClockedOut,
            (None, None) => AttendanceState::NotCheckedIn,
        };

        Ok(ShiftStatus {
            state,
            check_in,
            last_clock_out,
        })
    }

    /// Logs every check-in that survived a restart. Returns how many shifts
    /// are still open.
    pub async fn recover(&self) -> Result<usize, AttendanceError> {
        let mut open = 0;
        for slot in self.stage.list().await? {
            match slot {
                Ok(record) => {
                    open += 1;
                    info!(
                        staff_id = record.staff_id,
                        event_id = record.event_id,
                        shift_id = %record.shift_id,
                        check_in_time = %record.check_in_time,
                        "Open shift restored from staging"
                    );
                }
                Err(e) => warn!(error = %e, "Skipping unreadable staging slot"),
            }
        }
        Ok(open)
    }

    pub async fn broadcast(
        &self,
        event_id: u64,
        message: &str,
    ) -> Result<crate::remote::BroadcastAck, AttendanceError> {
        self.remote
            .broadcast(event_id, message)
            .await
            .map_err(|e| AttendanceError::RemoteSubmissionFailed(e.to_string()))
    }

    async fn run_check_in(
        &self,
        staff_id: u64,
        event_id: u64,
    ) -> Result<CheckInOutcome, AttendanceError> {
        // a double-tap waits here and then sees the first check-in
        let guard = self.check_in_locks.acquire(staff_id, event_id).await;

        if let Some(open) = self.stage.peek(staff_id, event_id).await? {
            return Err(AttendanceError::AlreadyCheckedIn {
                staff_id,
                event_id,
                check_in_time: open.check_in_time,
            });
        }

        let (frame, location) = self.capture().await?;

        if !self.verifier.verify_liveness(&frame).await? {
            return Err(AttendanceError::LivenessCheckFailed);
        }

        let submission = AttendanceSubmission::new(staff_id, event_id, &frame, location);
        let commit = CheckInCommit {
            remote: Arc::clone(&self.remote),
            stage: self.stage.clone(),
            clock: Arc::clone(&self.clock),
            closed: self.closed.clone(),
        };
        let task = actix_web::rt::spawn(
            async move {
                let _guard = guard;
                commit.run(submission, location).await
            }
            .instrument(Span::current()),
        );

        task.await
            .map_err(|e| AttendanceError::Storage(format!("check-in commit task failed: {e}")))?
    }

    async fn run_clock_out(
        &self,
        staff_id: u64,
        event_id: u64,
    ) -> Result<ClockOutOutcome, AttendanceError> {
        if self.stage.peek(staff_id, event_id).await?.is_none() {
            return Err(AttendanceError::NoActiveCheckIn { staff_id, event_id });
        }

        let (frame, location) = self.capture().await?;

        let reference = self
            .profiles
            .get_or_fetch(staff_id, self.remote.as_ref())
            .await
            .map_err(|e| {
                AttendanceError::VerificationUnavailable(format!("profile image: {e}"))
            })?;
        if !self.verifier.verify_match(&frame, &reference).await? {
            // the staff member may have re-enrolled since the image was cached
            self.profiles.invalidate(staff_id).await;
            return Err(AttendanceError::FaceMismatch);
        }

        // authoritative check: a second tab may have consumed it meanwhile
        let record = self
            .stage
            .consume(staff_id, event_id)
            .await
            .map_err(|e| match e {
                StageError::NoStagedRecord { staff_id, event_id } => {
                    AttendanceError::NoActiveCheckIn { staff_id, event_id }
                }
                other => other.into(),
            })?;

        let result = ClockOutResult::close(&record, self.clock.now());
        self.closed.insert((staff_id, event_id), result.clone()).await;

        let submission = AttendanceSubmission::new(staff_id, event_id, &frame, location);
        let remote = Arc::clone(&self.remote);
        let local = result.shift_duration;
        let shift_id = record.shift_id;

        let submit = actix_web::rt::spawn(
            async move {
                match remote.submit_clock_out(&submission).await {
                    Ok(ack) => {
                        if let Some(remote) = ack.shift_duration.filter(|d| *d != local) {
                            // local figure stands, the server may round differently
                            warn!(
                                remote_hours = remote.hours,
                                remote_minutes = remote.minutes,
                                remote_clock_out = ?ack.clock_out_time,
                                "Remote shift duration differs from local"
                            );
                        }
                        None
                    }
                    Err(e) => {
                        warn!(
                            error = %e,
                            shift_id = %shift_id,
                            "Remote clock-out not acknowledged, shift closed locally"
                        );
                        Some(AttendanceError::RemoteSubmissionFailed(e.to_string()))
                    }
                }
            }
            .instrument(Span::current()),
        );

        let warning = submit.await.unwrap_or_else(|e| {
            Some(AttendanceError::RemoteSubmissionFailed(format!(
                "submission task failed: {e}"
            )))
        });

        Ok(ClockOutOutcome { result, warning })
    }

    /// Camera, frame, location. The stream is released before the location
    /// fix is requested, whatever the capture outcome.
    async fn capture(&self) -> Result<(CapturedImage, Coordinates), AttendanceError> {
        let stream = self.device.acquire_camera(self.settings.facing).await?;
        let frame = self.device.capture_frame(&stream);
        self.device.release(&stream);
        drop(stream);
        let frame = frame?;

        let location = self
            .device
            .acquire_location(self.settings.location_timeout)
            .await?;
        Ok((frame, location))
    }
}

/// The part of a check-in that must not be abandoned halfway: once the
/// remote API is called, the answer is staged even if nobody waits for it.
struct CheckInCommit {
    remote: Arc<dyn RemoteAttendance>,
    stage: SessionStage,
    clock: Arc<dyn Clock>,
    closed: Cache<(u64, u64), ClockOutResult>,
}

impl CheckInCommit {
    async fn run(
        self,
        submission: AttendanceSubmission,
        location: Coordinates,
    ) -> Result<CheckInOutcome, AttendanceError> {
        let (staff_id, event_id) = (submission.staff_id, submission.event_id);
        let ack = self
            .remote
            .submit_check_in(&submission)
            .await
            .map_err(|e| AttendanceError::RemoteSubmissionFailed(e.to_string()))?;

        let record = CheckInRecord::new(staff_id, event_id, self.clock.now(), location);
        if let Some(remote_time) = ack.check_in_time {
            tracing::debug!(%remote_time, local_time = %record.check_in_time, "remote check-in time");
        }
        if let Some(open) = self.stage.stage_new(&record).await? {
            warn!(shift_id = %open.shift_id, "Slot taken by another agent, keeping it");
            return Err(AttendanceError::AlreadyCheckedIn {
                staff_id,
                event_id,
                check_in_time: open.check_in_time,
            });
        }
        self.closed.invalidate(&(staff_id, event_id)).await;

        Ok(CheckInOutcome {
            record,
            message: ack.message,
        })
    }
}
