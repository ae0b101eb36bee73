use super::{DynCdnProvider, SyncError, UploadCache, UploadRecord, sha256_of_file};
use crate::manifest::{Manifest, MediaItem, MediaSource, MediaType};
use crate::naming;
use crate::{LibraryConfig, SyncConfig};
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct SyncFailure {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct SyncSummary {
    pub uploaded: usize,
    pub reused: usize,
    pub items_touched: usize,
    pub failures: Vec<SyncFailure>,
}

enum FileOutcome {
    Uploaded,
    Reused,
    Skipped,
}

struct ResolvedUpload {
    id: Option<String>,
    url: String,
    filename: String,
}

/// One batch reconciliation of the local collection directories against the
/// manifest and the CDN. Files are resolved strictly sequentially; the
/// manifest and cache are read once up front and written once at the end.
pub struct SyncRunner {
    config: SyncConfig,
    libraries: Vec<LibraryConfig>,
    provider: DynCdnProvider,
}

impl SyncRunner {
    pub fn new(config: &crate::Config, provider: DynCdnProvider) -> Self {
        Self {
            config: config.sync.clone(),
            libraries: config.libraries.clone(),
            provider,
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.config.base_dir.join(&self.config.manifest_path)
    }

    pub fn cache_path(&self) -> PathBuf {
        self.config.base_dir.join(&self.config.cache_path)
    }

    pub async fn run(&self) -> Result<SyncSummary, SyncError> {
        let manifest_path = self.manifest_path();
        let cache_path = self.cache_path();

        let mut manifest = Manifest::load(&manifest_path).await;
        let mut cache = UploadCache::load(&cache_path).await;
        // Per-run memo so one URL is probed at most once.
        let mut url_memo: HashMap<String, bool> = HashMap::new();
        let mut summary = SyncSummary::default();

        info!("Starting gallery sync via {}", self.provider.name());

        for library in &self.libraries {
            let category_dir = self.config.base_dir.join(&library.directory);
            let collection_dirs = list_collection_dirs(&category_dir).await?;
            if collection_dirs.is_empty() {
                debug!(
                    "Library '{}' has no collection directories under {:?}",
                    library.id, category_dir
                );
                continue;
            }

            manifest.ensure_category(&library.id, &library.label);

            for (folder_name, folder_path) in collection_dirs {
                let collection_id = naming::slugify(&folder_name);
                manifest
                    .ensure_category(&library.id, &library.label)
                    .ensure_collection(&collection_id);

                for file_path in walk_media_files(&folder_path) {
                    let outcome = self
                        .sync_one_file(
                            &mut manifest,
                            &mut cache,
                            &mut url_memo,
                            library,
                            &collection_id,
                            &file_path,
                        )
                        .await;

                    match outcome {
                        Ok(FileOutcome::Uploaded) => {
                            summary.uploaded += 1;
                            summary.items_touched += 1;
                        }
                        Ok(FileOutcome::Reused) => {
                            summary.reused += 1;
                            summary.items_touched += 1;
                        }
                        Ok(FileOutcome::Skipped) => {}
                        Err(e) if self.config.continue_on_error => {
                            warn!("Skipping {:?} after error: {}", file_path, e);
                            summary.failures.push(SyncFailure {
                                path: file_path.display().to_string(),
                                message: e.to_string(),
                            });
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }

        manifest.save(&manifest_path).await?;
        cache.save(&cache_path).await?;

        info!(
            "Sync complete: {} uploaded, {} reused, {} items touched, {} failed",
            summary.uploaded,
            summary.reused,
            summary.items_touched,
            summary.failures.len()
        );
        Ok(summary)
    }

    /// Resolves one file to a remote URL (cache hit, then manifest hash
    /// match, then fresh upload) and upserts its manifest item. The cache
    /// record is rewritten on every path so it always reflects the latest
    /// known local location.
    async fn sync_one_file(
        &self,
        manifest: &mut Manifest,
        cache: &mut UploadCache,
        url_memo: &mut HashMap<String, bool>,
        library: &LibraryConfig,
        collection_id: &str,
        file_path: &Path,
    ) -> Result<FileOutcome, SyncError> {
        let Some(file_name) = file_path.file_name().and_then(|name| name.to_str()) else {
            return Ok(FileOutcome::Skipped);
        };
        let file_name = file_name.to_string();
        let Some(media_type) = MediaType::from_file_name(&file_name) else {
            return Ok(FileOutcome::Skipped);
        };

        let local_path = relative_posix(&self.config.base_dir, file_path);
        let (hash, bytes) = sha256_of_file(file_path).await?;

        let existing = manifest
            .categories
            .get(&library.id)
            .and_then(|category| {
                category
                    .collections
                    .iter()
                    .find(|collection| collection.id == collection_id)
            })
            .and_then(|collection| collection.find_item_by_local_path(&local_path))
            .cloned();

        let mut resolved: Option<ResolvedUpload> = None;

        if let Some(record) = cache.get(&hash) {
            let candidate = ResolvedUpload {
                id: record.id.clone(),
                url: record.url.clone(),
                filename: record.filename.clone(),
            };
            if !candidate.url.is_empty() && self.url_is_live(url_memo, &candidate.url).await {
                debug!("Cache hit for {}", local_path);
                resolved = Some(candidate);
            }
        }

        if resolved.is_none()
            && let Some(item) = manifest.find_item_by_hash(&hash)
        {
            let (item_id, item_url) = (item.id.clone(), item.url.clone());
            if self.url_is_live(url_memo, &item_url).await {
                debug!("Manifest hash match for {}", local_path);
                resolved = Some(ResolvedUpload {
                    id: Some(item_id),
                    url: item_url,
                    filename: file_name.clone(),
                });
            }
        }

        let uploaded = resolved.is_none();
        let resolved = match resolved {
            Some(resolved) => resolved,
            None => {
                let result = self.provider.upload(&file_name, bytes).await?;
                info!("Uploaded {} -> {}", local_path, result.url);
                ResolvedUpload {
                    id: result.id,
                    url: result.url,
                    filename: file_name.clone(),
                }
            }
        };

        cache.put(
            hash.clone(),
            UploadRecord {
                id: resolved.id.clone(),
                url: resolved.url.clone(),
                filename: resolved.filename.clone(),
                last_seen_local_path: local_path.clone(),
                updated_at: Utc::now(),
            },
        );

        let title = naming::title_from_file_name(&file_name);
        let item = MediaItem {
            id: resolved
                .id
                .unwrap_or_else(|| format!("{}-{}", collection_id, naming::slugify(&file_name))),
            title: title.clone(),
            caption: existing
                .as_ref()
                .map(|item| item.caption.clone())
                .unwrap_or_default(),
            url: resolved.url,
            alt: existing
                .as_ref()
                .map(|item| item.alt.clone())
                .filter(|alt| !alt.is_empty())
                .unwrap_or_else(|| title.clone()),
            media_type,
            source: Some(MediaSource {
                local_path,
                sha256: hash,
            }),
        };

        manifest
            .ensure_category(&library.id, &library.label)
            .ensure_collection(collection_id)
            .upsert_item(item);

        Ok(if uploaded {
            FileOutcome::Uploaded
        } else {
            FileOutcome::Reused
        })
    }

    async fn url_is_live(&self, memo: &mut HashMap<String, bool>, url: &str) -> bool {
        if let Some(&live) = memo.get(url) {
            return live;
        }
        let live = self.provider.url_exists(url).await;
        memo.insert(url.to_string(), live);
        live
    }
}

/// Immediate sub-directories of a category directory, sorted by name. A
/// missing category directory is not an error, just an empty library.
async fn list_collection_dirs(dir: &Path) -> Result<Vec<(String, PathBuf)>, SyncError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut dirs = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir()
            && let Some(name) = entry.file_name().to_str()
        {
            dirs.push((name.to_string(), entry.path()));
        }
    }
    dirs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(dirs)
}

/// All media files under a collection directory, recursively, in a stable
/// order.
fn walk_media_files(dir: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(naming::is_media_file)
        })
        .collect()
}

/// Forward-slash path of `path` relative to `base`, as stored in
/// `source.localPath`.
fn relative_posix(base: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    relative
        .to_string_lossy()
        .replace(std::path::MAIN_SEPARATOR, "/")
}
