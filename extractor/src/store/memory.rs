use super::{ObjectStore, StoreError};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Objects held in process memory. Used for local runs and tests.
#[derive(Default)]
pub struct InMemoryStore {
    objects: RwLock<BTreeMap<String, Bytes>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Bytes> {
        self.objects.read().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.objects.read().keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn ensure_container_exists(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn put(&self, name: &str, body: Bytes, overwrite: bool) -> Result<(), StoreError> {
        let mut objects = self.objects.write();
        if !overwrite && objects.contains_key(name) {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }
        objects.insert(name.to_string(), body);
        Ok(())
    }
}
