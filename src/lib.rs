use axum::Router;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tower_http::trace::TraceLayer;

pub mod editor;
pub mod manifest;
pub mod naming;
pub mod sync;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default = "default_libraries")]
    pub libraries: Vec<LibraryConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4173,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub name: String,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "Mokuroku".to_string(),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// All sync paths (manifest, cache, env file, library directories) are
    /// resolved against this directory; `source.localPath` entries in the
    /// manifest are recorded relative to it.
    pub base_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub cache_path: PathBuf,
    pub env_file: PathBuf,
    pub api_base: String,
    /// When set, a per-file failure is recorded and skipped instead of
    /// aborting the whole run.
    #[serde(default)]
    pub continue_on_error: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            manifest_path: PathBuf::from("Assets/Text/gallery_collections.json"),
            cache_path: PathBuf::from("Local/.cache/cdn_upload_index.json"),
            env_file: PathBuf::from("Local/.env"),
            api_base: sync::DEFAULT_API_BASE.to_string(),
            continue_on_error: false,
        }
    }
}

/// One curated media tree: an editor root and a sync category at once.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryConfig {
    pub id: String,
    pub label: String,
    pub directory: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            app: AppConfig::default(),
            sync: SyncConfig::default(),
            libraries: default_libraries(),
        }
    }
}

fn default_libraries() -> Vec<LibraryConfig> {
    vec![
        LibraryConfig {
            id: "photos".to_string(),
            label: "Photos".to_string(),
            directory: PathBuf::from("Local/Gallery/Photos"),
        },
        LibraryConfig {
            id: "artworks".to_string(),
            label: "Artworks".to_string(),
            directory: PathBuf::from("Local/Gallery/Artworks"),
        },
    ]
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub config_path: PathBuf,
    pub editor: editor::EditorStore,
    pub sync_running: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(config: Config, config_path: PathBuf) -> Self {
        let editor = editor::EditorStore::new(
            config.sync.base_dir.clone(),
            config.libraries.clone(),
        );
        Self {
            config,
            config_path,
            editor,
            sync_running: Arc::new(AtomicBool::new(false)),
        }
    }
}

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/api/config",
            axum::routing::get(editor::handlers::config_handler),
        )
        .route(
            "/api/collections",
            axum::routing::get(editor::handlers::collections_handler),
        )
        .route(
            "/api/collection",
            axum::routing::get(editor::handlers::collection_items_handler)
                .post(editor::handlers::create_collection_handler),
        )
        .route(
            "/api/save",
            axum::routing::post(editor::handlers::save_handler),
        )
        .route(
            "/api/sync",
            axum::routing::post(editor::handlers::sync_handler),
        )
        .route(
            "/media/{root_id}/{collection}/{file_name}",
            axum::routing::get(editor::handlers::media_handler),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::info!(
                            target: "access_log",
                            status = %response.status(),
                            latency_ms = %latency.as_millis(),
                            "response"
                        );
                    },
                ),
        )
        .with_state(app_state)
}

pub fn create_app(config: Config, config_path: PathBuf) -> Router {
    router(AppState::new(config, config_path))
}
