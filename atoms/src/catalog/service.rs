use futures::stream::{self, StreamExt};
use std::path::Path;
use std::time::Duration;

use super::error::CatalogError;
use super::landing::{LandingGuard, SweepReport};
use super::model::{humanize_key, ImageRecord, MetadataPatch, TagsInput, UploadRequest};
use crate::store::{ObjectHead, ObjectStore, ObjectSummary, StoreError, StoredMetadata};

pub const ALLOWED_CONTENT_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Knobs for building the catalog listing
#[derive(Debug, Clone)]
pub struct ListOptions {
    /// Lifetime of each presigned `src` URL.
    pub presign_expiry: Duration,
    /// Metadata reads in flight at once.
    pub concurrency: usize,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            presign_expiry: Duration::from_secs(3600),
            concurrency: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    pub metadata: StoredMetadata,
    /// Present only when the update promoted the image.
    pub sweep: Option<SweepReport>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    pub key: String,
    pub location: String,
}

/// List every image with its metadata and a fresh presigned URL.
///
/// Only a failed listing fails the call. A failed metadata read yields a
/// fallback record for that key. Records come back in store order.
pub async fn list_catalog(
    store: &dyn ObjectStore,
    opts: &ListOptions,
) -> Result<Vec<ImageRecord>, CatalogError> {
    let objects = store.list_objects().await?;
    tracing::debug!(count = objects.len(), "listing catalog");

    let records: Vec<ImageRecord> = stream::iter(objects)
        .map(|obj| load_record(store, obj, opts.presign_expiry))
        .buffered(opts.concurrency.max(1))
        .collect()
        .await;

    Ok(records)
}

async fn load_record(store: &dyn ObjectStore, obj: ObjectSummary, expiry: Duration) -> ImageRecord {
    let (head, presigned) = tokio::join!(
        store.head_object(&obj.key),
        store.presign_get(&obj.key, expiry)
    );

    let src = match presigned {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(key = %obj.key, error = %e, "presign failed, falling back to object location");
            store.object_location(&obj.key)
        }
    };

    match head {
        Ok(head) => record_from_head(obj, head, src),
        Err(e) => {
            tracing::warn!(key = %obj.key, error = %e, "metadata read failed, using fallback record");
            fallback_record(obj, src)
        }
    }
}

fn record_from_head(obj: ObjectSummary, head: ObjectHead, src: String) -> ImageRecord {
    let meta = head.metadata;
    let name = meta
        .title
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| humanize_key(&obj.key));
    let original_filename = meta
        .original_name
        .filter(|original| !original.is_empty())
        .unwrap_or_else(|| obj.key.clone());

    ImageRecord {
        alt: format!("Image of {name}"),
        name,
        description: meta.description.unwrap_or_default(),
        category: meta.category.unwrap_or_default(),
        tags: meta.tags.unwrap_or_default(),
        original_filename,
        src,
        last_modified: obj.last_modified.or(head.last_modified),
        size: obj.size,
        is_landing_image: meta.is_landing_image.unwrap_or(false),
        show_in_carousel: meta.show_in_carousel.unwrap_or(false),
        content_type: head.content_type,
        id: obj.key,
    }
}

fn fallback_record(obj: ObjectSummary, src: String) -> ImageRecord {
    let name = humanize_key(&obj.key);
    ImageRecord {
        alt: format!("Image of {name}"),
        name,
        description: String::new(),
        category: String::new(),
        tags: Vec::new(),
        original_filename: obj.key.clone(),
        src,
        last_modified: obj.last_modified,
        size: obj.size,
        is_landing_image: false,
        show_in_carousel: false,
        content_type: None,
        id: obj.key,
    }
}

/// Merge a patch into an image's metadata and write it back.
///
/// The target is read first, so an unknown id fails before any sweep runs.
/// When the patch promotes the image, `guard` demotes every other landing
/// image before the write; its failures are logged, not returned. A failed
/// read or write of the target itself fails the call.
pub async fn update_metadata(
    store: &dyn ObjectStore,
    guard: &dyn LandingGuard,
    id: &str,
    patch: MetadataPatch,
) -> Result<UpdateOutcome, CatalogError> {
    if id.trim().is_empty() {
        return Err(CatalogError::Validation("image id is required".to_string()));
    }

    let head = store.head_object(id).await.map_err(|e| target_error(id, e))?;

    let sweep = if patch.promotes_landing_image() {
        let report = guard.demote_others(store, id).await;
        if !report.is_clean() {
            tracing::warn!(
                id,
                failed = report.failed,
                listed = report.listed,
                "landing sweep incomplete, promoting anyway"
            );
        }
        Some(report)
    } else {
        None
    };

    let merged = merge_metadata(id, head.metadata, &patch);
    store
        .replace_metadata(id, head.content_type.as_deref(), &merged)
        .await
        .map_err(|e| target_error(id, e))?;

    tracing::info!(id, landing = merged.is_landing_image(), "metadata updated");
    Ok(UpdateOutcome {
        metadata: merged,
        sweep,
    })
}

fn target_error(id: &str, err: StoreError) -> CatalogError {
    match err {
        StoreError::NotFound(_) => CatalogError::NotFound(id.to_string()),
        other => CatalogError::Store(other),
    }
}

/// Field by field: patch value, else stored value, else default.
/// Title and category default to the humanised key.
pub fn merge_metadata(key: &str, existing: StoredMetadata, patch: &MetadataPatch) -> StoredMetadata {
    StoredMetadata {
        title: Some(
            patch
                .title
                .clone()
                .or(existing.title)
                .unwrap_or_else(|| humanize_key(key)),
        ),
        description: Some(
            patch
                .description
                .clone()
                .or(existing.description)
                .unwrap_or_default(),
        ),
        category: Some(
            patch
                .category
                .clone()
                .or(existing.category)
                .unwrap_or_else(|| humanize_key(key)),
        ),
        tags: Some(
            patch
                .tags
                .as_ref()
                .map(TagsInput::normalize)
                .or(existing.tags)
                .unwrap_or_default(),
        ),
        is_landing_image: Some(
            patch
                .is_landing_image
                .or(existing.is_landing_image)
                .unwrap_or(false),
        ),
        show_in_carousel: Some(
            patch
                .show_in_carousel
                .or(existing.show_in_carousel)
                .unwrap_or(false),
        ),
        original_name: existing.original_name,
        upload_date: existing.upload_date,
        extra: existing.extra,
    }
}

/// Store a new image. Both display flags start out false.
pub async fn create_image(
    store: &dyn ObjectStore,
    upload: UploadRequest,
) -> Result<UploadOutcome, CatalogError> {
    validate_upload(&upload)?;

    let key = match Path::new(&upload.filename)
        .extension()
        .and_then(|ext| ext.to_str())
    {
        Some(ext) => format!("{}.{}", uuid::Uuid::new_v4(), ext.to_ascii_lowercase()),
        None => uuid::Uuid::new_v4().to_string(),
    };

    let meta = upload.metadata;
    let metadata = StoredMetadata {
        title: Some(meta.title.unwrap_or_default()),
        description: Some(meta.description.unwrap_or_default()),
        category: Some(meta.category.unwrap_or_default()),
        tags: Some(meta.tags.as_ref().map(TagsInput::normalize).unwrap_or_default()),
        original_name: Some(upload.filename.clone()),
        upload_date: Some(chrono::Utc::now().to_rfc3339()),
        is_landing_image: Some(false),
        show_in_carousel: Some(false),
        extra: Default::default(),
    };

    let size = upload.body.len();
    store
        .put_object(&key, upload.body, &upload.content_type, &metadata)
        .await?;

    tracing::info!(key = %key, original = %upload.filename, size, "image uploaded");
    Ok(UploadOutcome {
        location: store.object_location(&key),
        key,
    })
}

fn validate_upload(upload: &UploadRequest) -> Result<(), CatalogError> {
    if upload.filename.trim().is_empty() {
        return Err(CatalogError::Validation("filename is required".to_string()));
    }
    if !upload.filename.is_ascii() {
        // S3 user metadata travels as HTTP headers.
        return Err(CatalogError::Validation(
            "filename must be ASCII".to_string(),
        ));
    }
    if upload.body.is_empty() {
        return Err(CatalogError::Validation("No file provided".to_string()));
    }
    if !ALLOWED_CONTENT_TYPES.contains(&upload.content_type.as_str()) {
        return Err(CatalogError::Validation(format!(
            "File type not allowed. Allowed types: {}",
            ALLOWED_CONTENT_TYPES.join(", ")
        )));
    }
    if upload.body.len() > MAX_UPLOAD_BYTES {
        return Err(CatalogError::Validation(format!(
            "File too large. Maximum size is {}MB",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}
