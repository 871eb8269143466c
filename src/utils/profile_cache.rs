use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::model::check_in_record::CapturedImage;
use crate::remote::{RemoteAttendance, RemoteError};

/// Staff reference images, fetched from the remote API on first use.
#[derive(Clone)]
pub struct ProfileImageCache {
    images: Cache<u64, Arc<CapturedImage>>,
}

impl ProfileImageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            images: Cache::builder()
                .max_capacity(2_000) // one kiosk rarely sees more staff than this
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Cached image, or a fresh fetch. Concurrent misses for one staff member
    /// share a single remote call.
    pub async fn get_or_fetch(
        &self,
        staff_id: u64,
        remote: &dyn RemoteAttendance,
    ) -> Result<Arc<CapturedImage>, Arc<RemoteError>> {
        self.images
            .try_get_with(staff_id, async {
                tracing::debug!(staff_id, "fetching profile image");
                remote.profile_image(staff_id).await.map(Arc::new)
            })
            .await
    }

    /// Drop a cached image, e.g. after the staff member re-enrolled.
    pub async fn invalidate(&self, staff_id: u64) {
        self.images.invalidate(&staff_id).await;
    }
}
