use super::{CollectionSummary, EditorError, EditorItem, RootInfo, SaveItem};
use crate::manifest::MediaType;
use crate::naming;
use crate::LibraryConfig;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Filesystem CRUD over the configured library roots. The directory itself
/// is the persistence layer: item order and titles live in the filenames,
/// so every mutation is a rename.
#[derive(Clone)]
pub struct EditorStore {
    base_dir: PathBuf,
    libraries: Vec<LibraryConfig>,
}

/// Rejects empty segments, traversal attempts, and separators before any
/// path is built from client input.
fn safe_segment(segment: &str) -> Option<&str> {
    if segment.is_empty() || segment.contains("..") || segment.contains(['/', '\\']) {
        None
    } else {
        Some(segment)
    }
}

fn media_url(root_id: &str, collection: &str, file_name: &str) -> String {
    format!(
        "/media/{}/{}/{}",
        urlencoding::encode(root_id),
        urlencoding::encode(collection),
        urlencoding::encode(file_name)
    )
}

impl EditorStore {
    pub fn new(base_dir: PathBuf, libraries: Vec<LibraryConfig>) -> Self {
        Self { base_dir, libraries }
    }

    pub fn roots(&self) -> Vec<RootInfo> {
        self.libraries
            .iter()
            .map(|library| RootInfo {
                id: library.id.clone(),
                label: library.label.clone(),
            })
            .collect()
    }

    pub fn default_root_id(&self) -> Option<&str> {
        self.libraries.first().map(|library| library.id.as_str())
    }

    fn resolve_root(&self, root_id: &str) -> Result<PathBuf, EditorError> {
        self.libraries
            .iter()
            .find(|library| library.id == root_id)
            .map(|library| self.base_dir.join(&library.directory))
            .ok_or_else(|| EditorError::UnknownRoot(root_id.to_string()))
    }

    /// Media files of a directory in canonical display order.
    async fn sorted_media_files(dir: &Path) -> Result<Vec<String>, EditorError> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file()
                && let Some(name) = entry.file_name().to_str()
                && naming::is_media_file(name)
            {
                names.push(name.to_string());
            }
        }
        naming::sort_by_index_then_name(&mut names);
        Ok(names)
    }

    pub async fn list_collections(
        &self,
        root_id: &str,
    ) -> Result<Vec<CollectionSummary>, EditorError> {
        let root_path = self.resolve_root(root_id)?;
        tokio::fs::create_dir_all(&root_path).await?;

        let mut collections = Vec::new();
        let mut entries = tokio::fs::read_dir(&root_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(|name| name.to_string()) else {
                continue;
            };

            let media_files = Self::sorted_media_files(&entry.path()).await?;
            let previews = media_files
                .iter()
                .filter(|file_name| naming::is_image_file(file_name))
                .take(3)
                .map(|file_name| media_url(root_id, &name, file_name))
                .collect();

            collections.push(CollectionSummary {
                name,
                item_count: media_files.len(),
                previews,
            });
        }

        collections.sort_by(|a, b| naming::natural_compare(&a.name, &b.name));
        Ok(collections)
    }

    pub async fn collection_items(
        &self,
        root_id: &str,
        collection: &str,
    ) -> Result<Vec<EditorItem>, EditorError> {
        let root_path = self.resolve_root(root_id)?;
        let collection = safe_segment(collection).ok_or(EditorError::InvalidName)?;

        let collection_path = root_path.join(collection);
        tokio::fs::create_dir_all(&collection_path).await?;

        let media_files = Self::sorted_media_files(&collection_path).await?;
        Ok(media_files
            .into_iter()
            .map(|file_name| {
                let url = media_url(root_id, collection, &file_name);
                let media_type = if naming::is_image_file(&file_name) {
                    MediaType::Image
                } else {
                    MediaType::Video
                };
                EditorItem {
                    title: naming::parse_prefixed_name(&file_name).title,
                    preview_url: url.clone(),
                    url,
                    original_file_name: file_name,
                    media_type,
                }
            })
            .collect())
    }

    /// Creates an empty collection directory, returning the sanitized name.
    pub async fn create_collection(
        &self,
        root_id: &str,
        collection_name: &str,
    ) -> Result<String, EditorError> {
        let root_path = self.resolve_root(root_id)?;
        let cleaned = naming::sanitize_title(collection_name);
        let name = safe_segment(&cleaned).ok_or(EditorError::InvalidName)?;

        tokio::fs::create_dir_all(root_path.join(name)).await?;
        info!("Created collection '{}' under root '{}'", name, root_id);
        Ok(name.to_string())
    }

    /// Applies a client-submitted order and titles to a collection by
    /// renaming files. Validation is all-or-nothing: nothing on disk moves
    /// unless every referenced source file exists exactly once. The renames
    /// run in two phases (everything to a unique temp name, then to final
    /// names) so an old name never collides with another file's new name.
    pub async fn save_collection(
        &self,
        root_id: &str,
        collection_name: &str,
        items: &[SaveItem],
    ) -> Result<Vec<EditorItem>, EditorError> {
        let root_path = self.resolve_root(root_id)?;
        let collection = safe_segment(collection_name).ok_or(EditorError::InvalidName)?;
        let collection_path = root_path.join(collection);
        tokio::fs::create_dir_all(&collection_path).await?;

        let existing: HashSet<String> = Self::sorted_media_files(&collection_path)
            .await?
            .into_iter()
            .collect();

        let mut seen = HashSet::new();
        for item in items {
            let original = safe_segment(&item.original_file_name)
                .ok_or_else(|| EditorError::MissingSource(item.original_file_name.clone()))?;
            if !existing.contains(original) {
                return Err(EditorError::MissingSource(original.to_string()));
            }
            if !seen.insert(original.to_string()) {
                return Err(EditorError::DuplicateSource(original.to_string()));
            }
        }

        struct RenameStep {
            original: String,
            temp: String,
            desired: String,
        }

        let mut taken = HashSet::new();
        let plan: Vec<RenameStep> = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let original = item.original_file_name.clone();
                let (_, ext) = naming::split_extension(&original);
                let fallback = naming::parse_prefixed_name(&original).title;
                let mut title = naming::sanitize_title(&item.title);
                if title.is_empty() {
                    title = if fallback.is_empty() {
                        "Untitled".to_string()
                    } else {
                        fallback
                    };
                }
                let desired = format!("{} - {}{}", index + 1, title, ext);
                RenameStep {
                    temp: format!(".__tmp__.{}{}", Uuid::new_v4(), ext),
                    desired: naming::next_unique_name(&desired, &mut taken),
                    original,
                }
            })
            .collect();

        // Phase 1: everything out of the way under unique temp names.
        for step in &plan {
            tokio::fs::rename(
                collection_path.join(&step.original),
                collection_path.join(&step.temp),
            )
            .await?;
        }
        // Phase 2: temp names to final names.
        for step in &plan {
            tokio::fs::rename(
                collection_path.join(&step.temp),
                collection_path.join(&step.desired),
            )
            .await?;
        }

        debug!(
            "Saved collection '{}' under root '{}' ({} items)",
            collection,
            root_id,
            plan.len()
        );

        // The directory, not the request, is authoritative for the result.
        self.collection_items(root_id, collection).await
    }

    /// Resolves a media file path for streaming, rejecting traversal.
    pub fn media_path(
        &self,
        root_id: &str,
        collection: &str,
        file_name: &str,
    ) -> Result<PathBuf, EditorError> {
        let root_path = self.resolve_root(root_id)?;
        let collection = safe_segment(collection).ok_or(EditorError::InvalidPath)?;
        let file_name = safe_segment(file_name).ok_or(EditorError::InvalidPath)?;
        Ok(root_path.join(collection).join(file_name))
    }
}
