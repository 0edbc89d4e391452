use super::{KeyValueStore, PersistenceResult};
use std::collections::HashMap;
use std::sync::Mutex;

/// Volatile store, mostly for tests and for running without a data dir.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    values: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        let values = self.values.lock().unwrap_or_else(|p| p.into_inner());
        let mut keys: Vec<String> = values.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn load(&self, key: &str) -> PersistenceResult<Option<Vec<u8>>> {
        let values = self.values.lock().unwrap_or_else(|p| p.into_inner());
        Ok(values.get(key).cloned())
    }

    fn save(&self, key: &str, value: &[u8]) -> PersistenceResult<()> {
        let mut values = self.values.lock().unwrap_or_else(|p| p.into_inner());
        values.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}
