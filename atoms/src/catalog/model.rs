use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::metadata::split_tags;

/// Catalog entry as the gallery frontend sees it
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub original_filename: String,
    pub alt: String,
    pub src: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub size: u64,
    pub is_landing_image: bool,
    pub show_in_carousel: bool,
    #[serde(skip)]
    pub content_type: Option<String>,
}

/// Tags arrive either pre-split or as one comma-separated string
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum TagsInput {
    Text(String),
    List(Vec<String>),
}

impl TagsInput {
    pub fn normalize(&self) -> Vec<String> {
        match self {
            TagsInput::Text(raw) => split_tags(raw),
            // Tags are stored comma-joined, so a comma inside an item is a separator.
            TagsInput::List(items) => items.iter().flat_map(|item| split_tags(item)).collect(),
        }
    }
}

/// PUT /cakes/{id} body. Absent fields keep their stored value.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Option<TagsInput>,
    pub is_landing_image: Option<bool>,
    pub show_in_carousel: Option<bool>,
}

impl MetadataPatch {
    pub fn promotes_landing_image(&self) -> bool {
        self.is_landing_image == Some(true)
    }
}

/// Text metadata sent alongside an upload
#[derive(Debug, Deserialize, Default, Clone)]
pub struct UploadMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Option<TagsInput>,
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub filename: String,
    pub content_type: String,
    pub body: Vec<u8>,
    pub metadata: UploadMetadata,
}

#[derive(Debug, Serialize, Clone)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub location: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}

/// Human-readable name for a key: extension stripped, `-` and `_` become spaces.
pub fn humanize_key(key: &str) -> String {
    let stem = key.split('.').next().unwrap_or(key);
    stem.replace(['-', '_'], " ")
}
