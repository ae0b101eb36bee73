use super::{Category, Collection, Manifest, MediaItem};
use crate::naming;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl Manifest {
    /// Loads the manifest, falling back to the empty shape when the file is
    /// absent or unparseable. The sync run reconciles every entry it needs,
    /// so corrupt JSON is recovered from rather than propagated.
    pub async fn load(path: &Path) -> Self {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(_) => {
                debug!("Manifest not found at {:?}, starting empty", path);
                return Manifest::default();
            }
        };

        match serde_json::from_str::<Manifest>(&raw) {
            Ok(manifest) => {
                info!(
                    "Loaded manifest with {} categories from {:?}",
                    manifest.categories.len(),
                    path
                );
                manifest
            }
            Err(e) => {
                warn!("Manifest at {:?} is not valid JSON ({}), starting empty", path, e);
                Manifest::default()
            }
        }
    }

    /// Pretty-printed JSON with a trailing newline, parent directories
    /// created as needed. Direct overwrite; the manifest is only written at
    /// the end of a run.
    pub async fn save(&self, path: &Path) -> Result<(), ManifestError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, format!("{}\n", json)).await?;
        Ok(())
    }

    /// First item anywhere in the manifest whose content hash matches and
    /// whose URL is non-empty. This is what makes the same bytes filed under
    /// two collections reuse one upload.
    pub fn find_item_by_hash(&self, hash: &str) -> Option<&MediaItem> {
        self.categories
            .values()
            .flat_map(|category| &category.collections)
            .flat_map(|collection| &collection.items)
            .find(|item| {
                !item.url.is_empty()
                    && item
                        .source
                        .as_ref()
                        .is_some_and(|source| source.sha256 == hash)
            })
    }

    /// Idempotent get-or-create; an existing category keeps its label.
    pub fn ensure_category(&mut self, id: &str, label: &str) -> &mut Category {
        let category = self
            .categories
            .entry(id.to_string())
            .or_insert_with(|| Category {
                label: label.to_string(),
                collections: Vec::new(),
            });
        if category.label.is_empty() {
            category.label = label.to_string();
        }
        category
    }
}

impl Category {
    pub fn collection_mut(&mut self, id: &str) -> Option<&mut Collection> {
        self.collections
            .iter_mut()
            .find(|collection| collection.id == id)
    }

    /// Idempotent get-or-create by collection id. A new collection gets a
    /// display name derived from the slug and an empty description.
    pub fn ensure_collection(&mut self, id: &str) -> &mut Collection {
        if let Some(index) = self
            .collections
            .iter()
            .position(|collection| collection.id == id)
        {
            return &mut self.collections[index];
        }

        self.collections.push(Collection {
            id: id.to_string(),
            name: naming::title_from_slug(id),
            description: String::new(),
            items: Vec::new(),
        });
        self.collections.last_mut().unwrap()
    }
}

impl Collection {
    pub fn find_item_by_local_path(&self, local_path: &str) -> Option<&MediaItem> {
        self.items.iter().find(|item| {
            item.source
                .as_ref()
                .is_some_and(|source| source.local_path == local_path)
        })
    }

    /// Overwrites the item at the same `source.localPath` in place
    /// (preserving its position in the display order), else appends.
    pub fn upsert_item(&mut self, item: MediaItem) {
        let local_path = item.source.as_ref().map(|source| source.local_path.clone());
        let existing = local_path.as_deref().and_then(|path| {
            self.items.iter_mut().find(|candidate| {
                candidate
                    .source
                    .as_ref()
                    .is_some_and(|source| source.local_path == path)
            })
        });

        match existing {
            Some(slot) => *slot = item,
            None => self.items.push(item),
        }
    }
}
