use axum::http::StatusCode;
use axum_test::TestServer;
use mokuroku::{AppState, Config, LibraryConfig, create_app, router};
use serde_json::{Value, json};
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper to create a test configuration with two library roots.
fn create_test_config(temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.sync.base_dir = temp_dir.path().to_path_buf();
    config.libraries = vec![
        LibraryConfig {
            id: "photos".to_string(),
            label: "Photos".to_string(),
            directory: PathBuf::from("Photos"),
        },
        LibraryConfig {
            id: "artworks".to_string(),
            label: "Artworks".to_string(),
            directory: PathBuf::from("Artworks"),
        },
    ];
    config
}

fn create_test_server(temp_dir: &TempDir) -> TestServer {
    let config = create_test_config(temp_dir);
    let app = create_app(config, temp_dir.path().join("config.toml"));
    TestServer::new(app).unwrap()
}

fn write_media(temp_dir: &TempDir, root: &str, collection: &str, files: &[&str]) {
    let dir = temp_dir.path().join(root).join(collection);
    std::fs::create_dir_all(&dir).unwrap();
    for name in files {
        std::fs::write(dir.join(name), name.as_bytes()).unwrap();
    }
}

#[tokio::test]
async fn test_config_lists_roots() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server.get("/api/config").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    let roots = body["roots"].as_array().unwrap();
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0]["id"], "photos");
    assert_eq!(roots[0]["label"], "Photos");
    assert_eq!(roots[1]["id"], "artworks");
}

#[tokio::test]
async fn test_collections_default_root() {
    let temp_dir = TempDir::new().unwrap();
    write_media(&temp_dir, "Photos", "Trip", &["1 - A.jpg", "2 - B.jpg"]);
    write_media(&temp_dir, "Photos", "Abstract", &["1 - X.png"]);
    let server = create_test_server(&temp_dir);

    // No rootId: falls back to the first configured root
    let response = server.get("/api/collections").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    let collections = body["collections"].as_array().unwrap();
    assert_eq!(collections.len(), 2);
    assert_eq!(collections[0]["name"], "Abstract");
    assert_eq!(collections[1]["name"], "Trip");
    assert_eq!(collections[1]["itemCount"], 2);
    assert_eq!(
        collections[1]["previews"][0],
        "/media/photos/Trip/1%20-%20A.jpg"
    );
}

#[tokio::test]
async fn test_collections_unknown_root_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server
        .get("/api/collections")
        .add_query_param("rootId", "nope")
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn test_collection_items_in_display_order() {
    let temp_dir = TempDir::new().unwrap();
    write_media(
        &temp_dir,
        "Photos",
        "Trip",
        &["2 - B.png", "10 - A.png", "1 - C.png", "notes.png"],
    );
    let server = create_test_server(&temp_dir);

    let response = server
        .get("/api/collection")
        .add_query_param("collection", "Trip")
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    let items = body["items"].as_array().unwrap();
    let names: Vec<_> = items
        .iter()
        .map(|item| item["originalFileName"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["1 - C.png", "2 - B.png", "10 - A.png", "notes.png"]);
    assert_eq!(items[0]["title"], "C");
    assert_eq!(items[0]["mediaType"], "image");
}

#[tokio::test]
async fn test_create_collection() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server
        .post("/api/collection")
        .json(&json!({ "rootId": "artworks", "collectionName": "New  Works" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);

    let body: Value = response.json();
    assert_eq!(body["ok"], true);
    assert_eq!(body["collectionName"], "New Works");
    assert!(temp_dir.path().join("Artworks").join("New Works").is_dir());
}

#[tokio::test]
async fn test_create_collection_rejects_invalid_name() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server
        .post("/api/collection")
        .json(&json!({ "collectionName": "  " }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["error"], "Invalid collection details.");
}

#[tokio::test]
async fn test_save_reorders_collection() {
    let temp_dir = TempDir::new().unwrap();
    write_media(
        &temp_dir,
        "Photos",
        "Trip",
        &["1 - A.jpg", "2 - B.jpg", "3 - C.jpg"],
    );
    let server = create_test_server(&temp_dir);

    let response = server
        .post("/api/save")
        .json(&json!({
            "collectionName": "Trip",
            "items": [
                { "originalFileName": "3 - C.jpg", "title": "C" },
                { "originalFileName": "1 - A.jpg", "title": "A" },
                { "originalFileName": "2 - B.jpg", "title": "B" },
            ],
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["ok"], true);
    let names: Vec<_> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["originalFileName"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["1 - C.jpg", "2 - A.jpg", "3 - B.jpg"]);

    let dir = temp_dir.path().join("Photos").join("Trip");
    assert_eq!(std::fs::read(dir.join("1 - C.jpg")).unwrap(), b"3 - C.jpg");
    assert_eq!(std::fs::read(dir.join("2 - A.jpg")).unwrap(), b"1 - A.jpg");
}

#[tokio::test]
async fn test_save_rejects_unknown_source_file() {
    let temp_dir = TempDir::new().unwrap();
    write_media(&temp_dir, "Photos", "Trip", &["1 - A.jpg"]);
    let server = create_test_server(&temp_dir);

    let response = server
        .post("/api/save")
        .json(&json!({
            "collectionName": "Trip",
            "items": [{ "originalFileName": "ghost.jpg", "title": "Ghost" }],
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("ghost.jpg"));
    // Original file untouched
    assert!(
        temp_dir
            .path()
            .join("Photos")
            .join("Trip")
            .join("1 - A.jpg")
            .exists()
    );
}

#[tokio::test]
async fn test_media_streaming_and_not_found() {
    let temp_dir = TempDir::new().unwrap();
    write_media(&temp_dir, "Photos", "Trip", &["1 - A.jpg"]);
    let server = create_test_server(&temp_dir);

    let response = server.get("/media/photos/Trip/1%20-%20A.jpg").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "image/jpeg"
    );
    assert_eq!(response.as_bytes().as_ref(), b"1 - A.jpg");

    let response = server.get("/media/photos/Trip/missing.jpg").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sync_trigger_conflicts_while_running() {
    let temp_dir = TempDir::new().unwrap();
    let config = create_test_config(&temp_dir);
    let state = AppState::new(config, temp_dir.path().join("config.toml"));

    // Simulate an in-flight run; the endpoint must refuse a second trigger.
    state
        .sync_running
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let server = TestServer::new(router(state)).unwrap();

    let response = server.post("/api/sync").await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);

    let body: Value = response.json();
    assert_eq!(body["error"], "Sync already in progress.");
}
