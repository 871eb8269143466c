use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async lock per (staff, event) pair.
///
/// The guard is owned, so it can travel into a spawned task and keep the
/// key locked until that task has finished its work.
#[derive(Default)]
pub struct KeyLocks {
    slots: Mutex<HashMap<(u64, u64), Arc<Mutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, staff_id: u64, event_id: u64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut slots = self.slots.lock().await;
            // drop locks nobody is holding or waiting on
            slots.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(
                slots
                    .entry((staff_id, event_id))
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }
}
