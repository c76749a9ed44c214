use std::collections::HashMap;
use std::io;
use std::sync::{Mutex, PoisonError};

/// String key-value persistence used for the template document.
pub trait KeyValueStore: Send + Sync {
    fn persist(&self, key: &str, value: &str) -> io::Result<()>;

    /// `Ok(None)` when nothing was stored under `key`.
    fn load(&self, key: &str) -> io::Result<Option<String>>;
}

/// Process-local store, used by tests and as a scratch backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn persist(&self, key: &str, value: &str) -> io::Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn load(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }
}
