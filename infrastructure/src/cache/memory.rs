use celltype_application::{Fingerprint, ResponseCache};
use std::collections::HashMap;
use std::sync::RwLock;

/// Process-local response cache.
#[derive(Default)]
pub struct InMemoryResponseCache {
    entries: RwLock<HashMap<Fingerprint, Vec<String>>>,
}

impl InMemoryResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

impl ResponseCache for InMemoryResponseCache {
    fn get(&self, fingerprint: &Fingerprint) -> Option<Vec<String>> {
        self.entries.read().ok()?.get(fingerprint).cloned()
    }

    fn put(&self, fingerprint: &Fingerprint, lines: &[String]) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(fingerprint.clone(), lines.to_vec());
        }
    }
}
