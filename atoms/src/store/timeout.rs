use super::{ObjectHead, ObjectStore, ObjectSummary, StoreError, StoreResult, StoredMetadata};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Bounds every call on the inner store. An elapsed call surfaces as
/// `StoreError::Timeout` and is handled like any other store error.
#[derive(Debug)]
pub struct TimeoutStore<S> {
    inner: S,
    limit: Duration,
}

impl<S> TimeoutStore<S> {
    pub fn new(inner: S, limit: Duration) -> Self {
        Self { inner, limit }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn bounded<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = StoreResult<T>>,
    ) -> StoreResult<T> {
        match tokio::time::timeout(self.limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(op, limit_ms = self.limit.as_millis() as u64, "store call timed out");
                Err(StoreError::Timeout {
                    op,
                    after: self.limit,
                })
            }
        }
    }
}

#[async_trait]
impl<S: ObjectStore> ObjectStore for TimeoutStore<S> {
    async fn list_objects(&self) -> StoreResult<Vec<ObjectSummary>> {
        self.bounded("list_objects", self.inner.list_objects()).await
    }

    async fn head_object(&self, key: &str) -> StoreResult<ObjectHead> {
        self.bounded("head_object", self.inner.head_object(key)).await
    }

    async fn replace_metadata(
        &self,
        key: &str,
        content_type: Option<&str>,
        metadata: &StoredMetadata,
    ) -> StoreResult<()> {
        self.bounded(
            "replace_metadata",
            self.inner.replace_metadata(key, content_type, metadata),
        )
        .await
    }

    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        metadata: &StoredMetadata,
    ) -> StoreResult<()> {
        self.bounded(
            "put_object",
            self.inner.put_object(key, body, content_type, metadata),
        )
        .await
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> StoreResult<String> {
        self.bounded("presign_get", self.inner.presign_get(key, expires_in))
            .await
    }

    fn object_location(&self, key: &str) -> String {
        self.inner.object_location(key)
    }
}
