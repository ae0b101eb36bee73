use super::{
    CollectionQuery, CollectionsQuery, CreateCollectionRequest, EditorError, SaveRequest,
    SyncRunResponse,
};
use crate::AppState;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use std::sync::atomic::Ordering;
use std::time::Instant;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{error, info, warn};

fn resolve_root_id(app_state: &AppState, requested: Option<String>) -> Result<String, EditorError> {
    match requested {
        Some(root_id) => Ok(root_id),
        None => app_state
            .editor
            .default_root_id()
            .map(|root_id| root_id.to_string())
            .ok_or_else(|| EditorError::UnknownRoot("(none configured)".to_string())),
    }
}

pub async fn config_handler(State(app_state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({ "roots": app_state.editor.roots() }))
}

pub async fn collections_handler(
    State(app_state): State<AppState>,
    Query(query): Query<CollectionsQuery>,
) -> Result<impl IntoResponse, EditorError> {
    let root_id = resolve_root_id(&app_state, query.root_id)?;
    let collections = app_state.editor.list_collections(&root_id).await?;
    Ok(Json(serde_json::json!({ "collections": collections })))
}

pub async fn collection_items_handler(
    State(app_state): State<AppState>,
    Query(query): Query<CollectionQuery>,
) -> Result<impl IntoResponse, EditorError> {
    let root_id = resolve_root_id(&app_state, query.root_id)?;
    let items = app_state
        .editor
        .collection_items(&root_id, &query.collection)
        .await?;
    Ok(Json(serde_json::json!({ "items": items })))
}

pub async fn create_collection_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateCollectionRequest>,
) -> Result<impl IntoResponse, EditorError> {
    let root_id = resolve_root_id(&app_state, payload.root_id)?;
    let name = app_state
        .editor
        .create_collection(&root_id, &payload.collection_name)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "ok": true, "collectionName": name })),
    ))
}

pub async fn save_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<SaveRequest>,
) -> Result<impl IntoResponse, EditorError> {
    let root_id = resolve_root_id(&app_state, payload.root_id)?;
    let items = app_state
        .editor
        .save_collection(&root_id, &payload.collection_name, &payload.items)
        .await?;
    Ok(Json(serde_json::json!({ "ok": true, "items": items })))
}

/// Triggers a sync run as a subprocess of this binary. A boolean
/// compare-and-set guards the single sync resource: a second trigger while
/// one runs gets an immediate 409, it is never queued.
pub async fn sync_handler(State(app_state): State<AppState>) -> Response {
    if app_state
        .sync_running
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        warn!("Rejected concurrent sync trigger");
        return (
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "error": "Sync already in progress." })),
        )
            .into_response();
    }

    let start = Instant::now();
    let result = run_sync_subprocess(&app_state).await;
    app_state.sync_running.store(false, Ordering::SeqCst);

    match result {
        Ok(output) => {
            let response = SyncRunResponse {
                ok: output.status.success(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                duration_ms: start.elapsed().as_millis(),
            };
            info!(
                "Sync subprocess finished in {} ms (ok: {})",
                response.duration_ms, response.ok
            );
            Json(response).into_response()
        }
        Err(message) => {
            error!("Sync trigger failed: {}", message);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": message })),
            )
                .into_response()
        }
    }
}

async fn run_sync_subprocess(app_state: &AppState) -> Result<std::process::Output, String> {
    let env_file = app_state
        .config
        .sync
        .base_dir
        .join(&app_state.config.sync.env_file);
    let api_key = crate::sync::resolve_api_key(&env_file)
        .await
        .ok_or_else(|| {
            format!(
                "Missing CDN_API_KEY. Add it to {:?} or export it in your shell.",
                env_file
            )
        })?;

    let exe = std::env::current_exe().map_err(|e| format!("Cannot locate binary: {}", e))?;
    info!("Spawning sync subprocess: {:?}", exe);

    tokio::process::Command::new(exe)
        .arg("--config")
        .arg(&app_state.config_path)
        .arg("sync")
        .env("CDN_API_KEY", api_key)
        .output()
        .await
        .map_err(|e| format!("Failed to run sync: {}", e))
}

pub async fn media_handler(
    State(app_state): State<AppState>,
    Path((root_id, collection, file_name)): Path<(String, String, String)>,
) -> Result<Response, EditorError> {
    let media_path = app_state
        .editor
        .media_path(&root_id, &collection, &file_name)?;

    let file = match File::open(&media_path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(EditorError::NotFound);
        }
        Err(e) => return Err(EditorError::IoError(e)),
    };

    let content_type = mime_guess::from_path(&media_path)
        .first_or_octet_stream()
        .to_string();
    let body = Body::from_stream(ReaderStream::new(file));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .body(body)
        .map_err(|e| {
            error!("Failed to build media response: {}", e);
            EditorError::NotFound
        })
}
