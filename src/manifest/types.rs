use crate::naming;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        if naming::is_image_file(file_name) {
            Some(MediaType::Image)
        } else if naming::is_video_file(file_name) {
            Some(MediaType::Video)
        } else {
            None
        }
    }
}

fn default_media_type() -> MediaType {
    MediaType::Image
}

/// Where an item came from on disk. The hash is the dedup key: identity
/// across runs is content, not filename.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaSource {
    pub local_path: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub caption: String,
    pub url: String,
    #[serde(default)]
    pub alt: String,
    // Older manifest entries imported by URL carry no type; default to image
    // rather than rejecting the whole document.
    #[serde(rename = "type", default = "default_media_type")]
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<MediaSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    /// Slug of the originating directory name, assigned once and stable
    /// even if the display name later changes.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub items: Vec<MediaItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub label: String,
    #[serde(default)]
    pub collections: Vec<Collection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub categories: BTreeMap<String, Category>,
}
