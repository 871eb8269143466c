//! Opaque face verification.
//!
//! Callers must keep "the verifier said no" (`Ok(false)`) apart from "the
//! verifier could not answer" (`Err(VerificationUnavailable)`).

mod http;

use async_trait::async_trait;

use crate::error::AttendanceError;
use crate::model::check_in_record::CapturedImage;

pub use http::HttpVerifier;

#[async_trait]
pub trait Verifier: Send + Sync + 'static {
    /// Is the image of a live person rather than a replayed photo?
    async fn verify_liveness(&self, image: &CapturedImage) -> Result<bool, AttendanceError>;

    /// Do both images show the same person?
    async fn verify_match(
        &self,
        image: &CapturedImage,
        reference: &CapturedImage,
    ) -> Result<bool, AttendanceError>;
}
