//! Sidecar metadata attached to every stored image.
//!
//! S3 user metadata is a flat map of case-insensitive string keys. This is
//! the one place where that map is turned into typed fields and back;
//! string booleans never get past `from_wire`.

use std::collections::{BTreeMap, HashMap};

pub const KEY_TITLE: &str = "title";
pub const KEY_DESCRIPTION: &str = "description";
pub const KEY_CATEGORY: &str = "category";
pub const KEY_TAGS: &str = "tags";
pub const KEY_ORIGINAL_NAME: &str = "originalname";
pub const KEY_UPLOAD_DATE: &str = "uploaddate";
pub const KEY_LANDING_IMAGE: &str = "islandingimage";
pub const KEY_SHOW_IN_CAROUSEL: &str = "showincarousel";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub original_name: Option<String>,
    pub upload_date: Option<String>,
    pub is_landing_image: Option<bool>,
    pub show_in_carousel: Option<bool>,
    /// Keys we don't model. Carried through every rewrite untouched.
    pub extra: BTreeMap<String, String>,
}

impl StoredMetadata {
    /// Decode a raw store map. Keys are lower-cased first.
    pub fn from_wire<I, K, V>(raw: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut meta = StoredMetadata::default();
        for (key, value) in raw {
            let key = key.as_ref().to_ascii_lowercase();
            let value: String = value.into();
            match key.as_str() {
                KEY_TITLE => meta.title = Some(value),
                KEY_DESCRIPTION => meta.description = Some(value),
                KEY_CATEGORY => meta.category = Some(value),
                KEY_TAGS => meta.tags = Some(split_tags(&value)),
                KEY_ORIGINAL_NAME => meta.original_name = Some(value),
                KEY_UPLOAD_DATE => meta.upload_date = Some(value),
                KEY_LANDING_IMAGE => meta.is_landing_image = Some(parse_flag(&value)),
                KEY_SHOW_IN_CAROUSEL => meta.show_in_carousel = Some(parse_flag(&value)),
                _ => {
                    meta.extra.insert(key, value);
                }
            }
        }
        meta
    }

    /// Encode for the store. Absent fields are omitted.
    pub fn to_wire(&self) -> HashMap<String, String> {
        let mut raw: HashMap<String, String> = self
            .extra
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let text_fields = [
            (KEY_TITLE, &self.title),
            (KEY_DESCRIPTION, &self.description),
            (KEY_CATEGORY, &self.category),
            (KEY_ORIGINAL_NAME, &self.original_name),
            (KEY_UPLOAD_DATE, &self.upload_date),
        ];
        for (key, value) in text_fields {
            if let Some(value) = value {
                raw.insert(key.to_string(), value.clone());
            }
        }

        if let Some(tags) = &self.tags {
            raw.insert(KEY_TAGS.to_string(), tags.join(","));
        }
        if let Some(flag) = self.is_landing_image {
            raw.insert(KEY_LANDING_IMAGE.to_string(), flag.to_string());
        }
        if let Some(flag) = self.show_in_carousel {
            raw.insert(KEY_SHOW_IN_CAROUSEL.to_string(), flag.to_string());
        }

        raw
    }

    pub fn is_landing_image(&self) -> bool {
        self.is_landing_image.unwrap_or(false)
    }

    pub fn show_in_carousel(&self) -> bool {
        self.show_in_carousel.unwrap_or(false)
    }
}

/// Split a comma-separated tag string, trimming and dropping empties.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_flag(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("true")
}
