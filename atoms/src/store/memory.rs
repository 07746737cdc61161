use super::{ObjectHead, ObjectStore, ObjectSummary, StoreError, StoreResult, StoredMetadata};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
struct MemoryObject {
    body: Vec<u8>,
    content_type: Option<String>,
    last_modified: DateTime<Utc>,
    /// Raw lower-cased string metadata, as S3 would hold it.
    metadata: HashMap<String, String>,
}

/// In-process object store for local runs and tests.
///
/// Keys list in lexicographic order, like `ListObjectsV2`.
#[derive(Debug)]
pub struct MemoryStore {
    bucket: String,
    objects: Mutex<BTreeMap<String, MemoryObject>>,
    issued: AtomicU64,
}

impl MemoryStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Mutex::new(BTreeMap::new()),
            issued: AtomicU64::new(0),
        }
    }

    /// Seed an object directly from raw string metadata.
    pub fn insert_raw<I, K, V>(&self, key: &str, content_type: &str, body: Vec<u8>, metadata: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let metadata = metadata
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_ascii_lowercase(), v.into()))
            .collect();
        self.lock().insert(
            key.to_string(),
            MemoryObject {
                body,
                content_type: Some(content_type.to_string()),
                last_modified: Utc::now(),
                metadata,
            },
        );
    }

    /// Raw metadata currently stored for `key`.
    pub fn raw_metadata(&self, key: &str) -> Option<HashMap<String, String>> {
        self.lock().get(key).map(|obj| obj.metadata.clone())
    }

    pub fn body(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().get(key).map(|obj| obj.body.clone())
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.lock().get(key).and_then(|obj| obj.content_type.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, MemoryObject>> {
        // A panic while holding the lock leaves the map itself consistent.
        self.objects.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_objects(&self) -> StoreResult<Vec<ObjectSummary>> {
        Ok(self
            .lock()
            .iter()
            .map(|(key, obj)| ObjectSummary {
                key: key.clone(),
                size: obj.body.len() as u64,
                last_modified: Some(obj.last_modified),
            })
            .collect())
    }

    async fn head_object(&self, key: &str) -> StoreResult<ObjectHead> {
        let objects = self.lock();
        let obj = objects
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

        Ok(ObjectHead {
            content_type: obj.content_type.clone(),
            size: obj.body.len() as u64,
            last_modified: Some(obj.last_modified),
            metadata: StoredMetadata::from_wire(obj.metadata.clone()),
        })
    }

    async fn replace_metadata(
        &self,
        key: &str,
        content_type: Option<&str>,
        metadata: &StoredMetadata,
    ) -> StoreResult<()> {
        let mut objects = self.lock();
        let obj = objects
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

        obj.metadata = metadata.to_wire();
        obj.content_type = content_type.map(str::to_string);
        obj.last_modified = Utc::now();
        Ok(())
    }

    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        metadata: &StoredMetadata,
    ) -> StoreResult<()> {
        self.lock().insert(
            key.to_string(),
            MemoryObject {
                body,
                content_type: Some(content_type.to_string()),
                last_modified: Utc::now(),
                metadata: metadata.to_wire(),
            },
        );
        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> StoreResult<String> {
        if !self.lock().contains_key(key) {
            return Err(StoreError::NotFound(key.to_string()));
        }
        let issued = self.issued.fetch_add(1, Ordering::Relaxed);
        let expires = Utc::now().timestamp() + expires_in.as_secs() as i64;
        Ok(format!(
            "{}?expires={}&sig={}",
            self.object_location(key),
            expires,
            issued
        ))
    }

    fn object_location(&self, key: &str) -> String {
        format!("memory://{}/{}", self.bucket, key)
    }
}
