//! Object-store contract used by the catalog.
//!
//! The catalog never talks to S3 directly. It takes any `ObjectStore` as an
//! argument, the same way the other atoms take their clients.

pub mod memory;
pub mod metadata;
pub mod timeout;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

pub use memory::MemoryStore;
pub use metadata::StoredMetadata;
pub use timeout::TimeoutStore;

/// Store operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("store call `{op}` timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("presign failed: {0}")]
    Presign(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// One entry from a full listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Result of a metadata read.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectHead {
    pub content_type: Option<String>,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub metadata: StoredMetadata,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List every object, following pagination to the end.
    async fn list_objects(&self) -> StoreResult<Vec<ObjectSummary>>;

    /// Read an object's metadata without fetching its payload.
    async fn head_object(&self, key: &str) -> StoreResult<ObjectHead>;

    /// Rewrite an object's metadata in place. The payload is untouched and
    /// the content type is written back as given.
    async fn replace_metadata(
        &self,
        key: &str,
        content_type: Option<&str>,
        metadata: &StoredMetadata,
    ) -> StoreResult<()>;

    /// Insert a new object.
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        metadata: &StoredMetadata,
    ) -> StoreResult<()>;

    /// Generate a time-limited read URL. Every call signs a new URL.
    async fn presign_get(&self, key: &str, expires_in: Duration) -> StoreResult<String>;

    /// Permanent, unsigned location of a key.
    fn object_location(&self, key: &str) -> String;
}
