use crate::manifest::MediaType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct RootInfo {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummary {
    pub name: String,
    pub item_count: usize,
    pub previews: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorItem {
    pub original_file_name: String,
    pub title: String,
    pub url: String,
    pub preview_url: String,
    pub media_type: MediaType,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveItem {
    pub original_file_name: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    #[serde(default)]
    pub root_id: Option<String>,
    #[serde(default)]
    pub collection_name: String,
    #[serde(default)]
    pub items: Vec<SaveItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCollectionRequest {
    #[serde(default)]
    pub root_id: Option<String>,
    #[serde(default)]
    pub collection_name: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CollectionsQuery {
    pub root_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CollectionQuery {
    pub root_id: Option<String>,
    #[serde(default)]
    pub collection: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRunResponse {
    pub ok: bool,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u128,
}
