use async_trait::async_trait;
use cakewalk_atoms::store::{
    MemoryStore, ObjectHead, ObjectStore, ObjectSummary, StoreError, StoreResult, StoredMetadata,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Wraps a `MemoryStore`, counts calls and fails chosen keys on demand.
pub struct FaultyStore {
    pub inner: MemoryStore,
    fail_head: Mutex<HashSet<String>>,
    fail_replace: Mutex<HashSet<String>>,
    fail_list: Mutex<bool>,
    stall_head: Mutex<HashSet<String>>,
    stall_replace: Mutex<HashSet<String>>,
    replace_calls: Mutex<HashMap<String, usize>>,
    list_calls: AtomicUsize,
}

#[allow(dead_code)]
impl FaultyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new("test-bucket"),
            fail_head: Mutex::new(HashSet::new()),
            fail_replace: Mutex::new(HashSet::new()),
            fail_list: Mutex::new(false),
            stall_head: Mutex::new(HashSet::new()),
            stall_replace: Mutex::new(HashSet::new()),
            replace_calls: Mutex::new(HashMap::new()),
            list_calls: AtomicUsize::new(0),
        }
    }

    pub fn seed(&self, key: &str, metadata: &[(&str, &str)]) {
        self.inner
            .insert_raw(key, "image/jpeg", vec![0xff, 0xd8], metadata.iter().copied());
    }

    pub fn fail_head_for(&self, key: &str) {
        self.fail_head.lock().unwrap().insert(key.to_string());
    }

    pub fn fail_replace_for(&self, key: &str) {
        self.fail_replace.lock().unwrap().insert(key.to_string());
    }

    pub fn fail_list(&self) {
        *self.fail_list.lock().unwrap() = true;
    }

    /// Head calls for `key` never complete.
    pub fn stall_head_for(&self, key: &str) {
        self.stall_head.lock().unwrap().insert(key.to_string());
    }

    /// Metadata writes for `key` never complete.
    pub fn stall_replace_for(&self, key: &str) {
        self.stall_replace.lock().unwrap().insert(key.to_string());
    }

    pub fn replace_calls(&self, key: &str) -> usize {
        self.replace_calls.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    pub fn total_replace_calls(&self) -> usize {
        self.replace_calls.lock().unwrap().values().sum()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn flag(&self, key: &str, flag: &str) -> Option<String> {
        self.inner.raw_metadata(key).and_then(|m| m.get(flag).cloned())
    }

    pub fn landing_keys(&self) -> Vec<String> {
        ["a.jpg", "b.jpg", "c.jpg", "d.jpg", "target.jpg"]
            .iter()
            .filter(|key| self.flag(key, "islandingimage").as_deref() == Some("true"))
            .map(|key| key.to_string())
            .collect()
    }
}

fn marked(set: &Mutex<HashSet<String>>, key: &str) -> bool {
    set.lock().unwrap().contains(key)
}

#[async_trait]
impl ObjectStore for FaultyStore {
    async fn list_objects(&self) -> StoreResult<Vec<ObjectSummary>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let fail = *self.fail_list.lock().unwrap();
        if fail {
            return Err(StoreError::Unavailable("list failed".into()));
        }
        self.inner.list_objects().await
    }

    async fn head_object(&self, key: &str) -> StoreResult<ObjectHead> {
        if marked(&self.fail_head, key) {
            return Err(StoreError::Unavailable(format!("head failed for {key}")));
        }
        if marked(&self.stall_head, key) {
            return std::future::pending().await;
        }
        self.inner.head_object(key).await
    }

    async fn replace_metadata(
        &self,
        key: &str,
        content_type: Option<&str>,
        metadata: &StoredMetadata,
    ) -> StoreResult<()> {
        *self
            .replace_calls
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default() += 1;
        if marked(&self.fail_replace, key) {
            return Err(StoreError::Unavailable(format!("copy failed for {key}")));
        }
        if marked(&self.stall_replace, key) {
            return std::future::pending().await;
        }
        self.inner.replace_metadata(key, content_type, metadata).await
    }

    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        metadata: &StoredMetadata,
    ) -> StoreResult<()> {
        self.inner.put_object(key, body, content_type, metadata).await
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> StoreResult<String> {
        self.inner.presign_get(key, expires_in).await
    }

    fn object_location(&self, key: &str) -> String {
        self.inner.object_location(key)
    }
}
