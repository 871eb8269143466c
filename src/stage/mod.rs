//! Durable staging of the in-flight check-in for each (staff, event) pair.

mod sqlite;
mod store;

use std::sync::Arc;

use derive_more::Display;

use crate::model::check_in_record::CheckInRecord;

pub use sqlite::SqliteStore;
pub use store::{KeyValueStore, MemoryStore};

const SLOT_PREFIX: &str = "attendance:checkin:";

#[derive(Debug, Display, PartialEq, Eq)]
pub enum StageError {
    #[display(fmt = "no staged check-in for staff {} at event {}", staff_id, event_id)]
    NoStagedRecord { staff_id: u64, event_id: u64 },

    #[display(fmt = "staged record under {} is unreadable: {}", key, reason)]
    Corrupt { key: String, reason: String },

    #[display(fmt = "staging backend error: {}", _0)]
    Backend(String),
}

impl std::error::Error for StageError {}

/// One JSON slot per (staff, event), holding at most one `CheckInRecord`.
#[derive(Clone)]
pub struct SessionStage {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn slot_key(staff_id: u64, event_id: u64) -> String {
        format!("{SLOT_PREFIX}{staff_id}:{event_id}")
    }

    /// Writes the record, replacing whatever was staged under the same key.
    pub async fn stage(&self, record: &CheckInRecord) -> Result<(), StageError> {
        let key = Self::slot_key(record.staff_id, record.event_id);
        let payload = serde_json::to_string(record).map_err(|e| StageError::Corrupt {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        self.store.set(&key, &payload).await
    }

    /// Stages `record` only if nothing is staged under its key yet. When a
    /// record is already there it is returned and left in place.
    pub async fn stage_new(
        &self,
        record: &CheckInRecord,
    ) -> Result<Option<CheckInRecord>, StageError> {
        let key = Self::slot_key(record.staff_id, record.event_id);
        let payload = serde_json::to_string(record).map_err(|e| StageError::Corrupt {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        if self.store.insert_new(&key, &payload).await? {
            return Ok(None);
        }
        match self.store.get(&key).await? {
            Some(existing) => decode(&key, &existing).map(Some),
            // consumed between the two calls; the caller lost the race anyway
            None => Err(StageError::Backend(format!("slot {key} changed during insert"))),
        }
    }

    pub async fn peek(
        &self,
        staff_id: u64,
        event_id: u64,
    ) -> Result<Option<CheckInRecord>, StageError> {
        let key = Self::slot_key(staff_id, event_id);
        match self.store.get(&key).await? {
            Some(payload) => decode(&key, &payload).map(Some),
            None => Ok(None),
        }
    }

    /// Read-and-delete. At most one caller per staged record gets it back.
    pub async fn consume(&self, staff_id: u64, event_id: u64) -> Result<CheckInRecord, StageError> {
        let key = Self::slot_key(staff_id, event_id);
        match self.store.delete(&key).await? {
            Some(payload) => decode(&key, &payload),
            None => Err(StageError::NoStagedRecord { staff_id, event_id }),
        }
    }

    /// Every staged record; unreadable slots are returned as errors next to
    /// the good ones rather than failing the whole listing.
    pub async fn list(&self) -> Result<Vec<Result<CheckInRecord, StageError>>, StageError> {
        let slots = self.store.scan(SLOT_PREFIX).await?;
        Ok(slots
            .iter()
            .map(|(key, payload)| decode(key, payload))
            .collect())
    }
}

fn decode(key: &str, payload: &str) -> Result<CheckInRecord, StageError> {
    serde_json::from_str(payload).map_err(|e| StageError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
