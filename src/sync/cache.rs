use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Last-known upload for one content hash. The cache is an optimization
/// layer only: a hit is trusted solely after the remote URL probes live,
/// and losing the file costs a manifest scan, never a re-upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub url: String,
    pub filename: String,
    pub last_seen_local_path: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadCache {
    #[serde(default)]
    pub files_by_sha256: BTreeMap<String, UploadRecord>,
}

impl UploadCache {
    /// Read-if-exists-else-empty; corrupt JSON degrades to empty the same
    /// way the manifest does.
    pub async fn load(path: &Path) -> Self {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(_) => {
                debug!("Upload cache not found at {:?}, starting empty", path);
                return UploadCache::default();
            }
        };

        match serde_json::from_str::<UploadCache>(&raw) {
            Ok(cache) => {
                info!("Loaded {} cached upload records", cache.files_by_sha256.len());
                cache
            }
            Err(e) => {
                warn!("Upload cache at {:?} is not valid JSON ({}), starting empty", path, e);
                UploadCache::default()
            }
        }
    }

    /// Full rewrite, pretty-printed with a trailing newline. Sync runs are
    /// infrequent batch operations, so incremental writes are not worth it.
    pub async fn save(&self, path: &Path) -> Result<(), crate::sync::SyncError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, format!("{}\n", json)).await?;
        Ok(())
    }

    pub fn get(&self, hash: &str) -> Option<&UploadRecord> {
        self.files_by_sha256.get(hash)
    }

    pub fn put(&mut self, hash: String, record: UploadRecord) {
        self.files_by_sha256.insert(hash, record);
    }
}
