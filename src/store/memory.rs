//! In-memory object store for tests and local replays (HashMap storage)

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::{ObjectStore, ObjectWrite, StoreError};
use crate::types::{ImageBuffer, ObjectReference};

/// An object as held by the in-memory store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

/// Store that keeps objects in memory and counts calls
#[derive(Clone, Default)]
pub struct InMemoryObjectStore {
    objects: Arc<RwLock<HashMap<ObjectReference, StoredObject>>>,
    get_calls: Arc<RwLock<usize>>,
    put_calls: Arc<RwLock<usize>>,
    /// Simulate errors if true
    simulate_access_denied: Arc<RwLock<bool>>,
    simulate_transient_failure: Arc<RwLock<bool>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without counting it as a put.
    pub fn insert(
        &self,
        bucket: &str,
        key: &str,
        body: impl Into<Bytes>,
        content_type: Option<&str>,
    ) {
        self.objects.write().insert(
            ObjectReference::new(bucket, key),
            StoredObject {
                body: body.into(),
                content_type: content_type.map(str::to_string),
                metadata: BTreeMap::new(),
            },
        );
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .read()
            .get(&ObjectReference::new(bucket, key))
            .cloned()
    }

    /// Keys stored in `bucket`, sorted.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .read()
            .keys()
            .filter(|object| object.bucket == bucket)
            .map(|object| object.key.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }

    pub fn get_count(&self) -> usize {
        *self.get_calls.read()
    }

    pub fn put_count(&self) -> usize {
        *self.put_calls.read()
    }

    /// Enable access denied simulation for testing
    pub fn set_access_denied(&self, enabled: bool) {
        *self.simulate_access_denied.write() = enabled;
    }

    /// Enable transient failure simulation for testing
    pub fn set_transient_failure(&self, enabled: bool) {
        *self.simulate_transient_failure.write() = enabled;
    }

    fn simulated_failure(&self, object: &ObjectReference) -> Option<StoreError> {
        if *self.simulate_access_denied.read() {
            return Some(StoreError::AccessDenied(format!(
                "{}: simulated access denied",
                object
            )));
        }
        if *self.simulate_transient_failure.read() {
            return Some(StoreError::Transient(format!(
                "{}: simulated 503 SlowDown",
                object
            )));
        }
        None
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get_object(&self, object: &ObjectReference) -> Result<ImageBuffer, StoreError> {
        *self.get_calls.write() += 1;

        if let Some(err) = self.simulated_failure(object) {
            return Err(err);
        }

        self.objects
            .read()
            .get(object)
            .map(|stored| ImageBuffer::new(stored.body.clone(), stored.content_type.clone()))
            .ok_or_else(|| StoreError::NotFound {
                bucket: object.bucket.clone(),
                key: object.key.clone(),
            })
    }

    async fn put_object(&self, write: ObjectWrite) -> Result<(), StoreError> {
        *self.put_calls.write() += 1;

        let target = ObjectReference::new(write.bucket, write.key);
        if let Some(err) = self.simulated_failure(&target) {
            return Err(err);
        }

        self.objects.write().insert(
            target,
            StoredObject {
                body: write.body,
                content_type: Some(write.content_type),
                metadata: write.metadata,
            },
        );
        Ok(())
    }
}
