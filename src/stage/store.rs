use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Mutex;

use async_trait::async_trait;

use super::StageError;

/// Minimal durable key-value store the staging slots sit on.
///
/// `delete` hands back the removed value. Implementations must make that
/// read-and-remove a single atomic step, since it is what keeps two
/// concurrent clock-outs from consuming the same check-in.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<String>, StageError>;

    /// Insert or replace.
    async fn set(&self, key: &str, value: &str) -> Result<(), StageError>;

    /// Insert only when the key is free. `false` means an existing value was
    /// left untouched. The check and the write are one atomic step.
    async fn insert_new(&self, key: &str, value: &str) -> Result<bool, StageError>;

    async fn delete(&self, key: &str) -> Result<Option<String>, StageError>;

    /// All `(key, value)` pairs whose key starts with `prefix`.
    async fn scan(&self, prefix: &str) -> Result<Vec<(String, String)>, StageError>;
}

/// Process-local store, used in tests and when no database is configured.
#[derive(Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StageError> {
        self.slots
            .lock()
            .map_err(|_| StageError::Backend("memory store poisoned".to_string()))
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StageError> {
        Ok(self.slots()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StageError> {
        self.slots()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn insert_new(&self, key: &str, value: &str) -> Result<bool, StageError> {
        match self.slots()?.entry(key.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(value.to_string());
                Ok(true)
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<Option<String>, StageError> {
        Ok(self.slots()?.remove(key))
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<(String, String)>, StageError> {
        let mut found: Vec<_> = self
            .slots()?
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        found.sort();
        Ok(found)
    }
}
