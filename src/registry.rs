use std::collections::HashMap;
use std::sync::Mutex;

/// Every key the generator has handed out, shared by all phases.
///
/// Entries are never removed. Each key maps to itself; the random reader
/// looks values up by the stored value.
#[derive(Debug, Default)]
pub struct KnownKeys {
    keys: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
}

impl KnownKeys {
    pub fn insert(&self, key: &[u8]) {
        self.keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_vec(), key.to_vec());
    }

    pub fn len(&self) -> usize {
        self.keys.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the registered keys in the map's (unspecified) iteration order.
    pub fn snapshot(&self) -> Vec<Vec<u8>> {
        self.keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect()
    }

    #[cfg(test)]
    pub fn entries(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
