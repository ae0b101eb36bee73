use crate::sync::SyncError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of pushing bytes (or a remote URL) to the CDN. The `url` is the
/// stable public location; `id` is the CDN's identifier when it returns one.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResult {
    #[serde(default)]
    pub id: Option<String>,
    pub url: String,
}

/// Seam between the sync pipeline and the object-storage API, so the
/// orchestrator can run against the real service, a dry-run stand-in, or a
/// test double.
#[async_trait]
pub trait CdnProvider: Send + Sync {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadResult, SyncError>;

    async fn upload_from_url(&self, source_url: &str) -> Result<UploadResult, SyncError>;

    /// Whether a previously recorded URL is still live. Network errors read
    /// as "not live": re-uploading is cheaper than publishing a dead link.
    async fn url_exists(&self, url: &str) -> bool;

    fn name(&self) -> &str;
}

pub type DynCdnProvider = Arc<dyn CdnProvider>;

#[derive(Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    error: Option<String>,
}

/// Bearer-token client for the real CDN API.
pub struct HttpCdnProvider {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl HttpCdnProvider {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into(),
            api_key: api_key.into(),
        }
    }

    async fn parse_upload_response(
        response: reqwest::Response,
        context: &str,
    ) -> Result<UploadResult, SyncError> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorPayload>(&body)
                .ok()
                .and_then(|payload| payload.error)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(SyncError::UploadFailed {
                path: context.to_string(),
                message,
            });
        }

        let result: UploadResult = serde_json::from_str(&body).map_err(|_| {
            SyncError::CdnError(format!("upload of {} returned no URL", context))
        })?;
        if result.url.is_empty() {
            return Err(SyncError::CdnError(format!(
                "upload of {} returned no URL",
                context
            )));
        }
        Ok(result)
    }
}

#[async_trait]
impl CdnProvider for HttpCdnProvider {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadResult, SyncError> {
        let mime = mime_guess::from_path(file_name).first_or_octet_stream();
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime.as_ref())?;
        let form = reqwest::multipart::Form::new().part("file", part);

        debug!("Uploading {} ({})", file_name, mime);
        let response = self
            .client
            .post(format!("{}/upload", self.api_base))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        Self::parse_upload_response(response, file_name).await
    }

    async fn upload_from_url(&self, source_url: &str) -> Result<UploadResult, SyncError> {
        let response = self
            .client
            .post(format!("{}/upload_from_url", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "url": source_url }))
            .send()
            .await?;

        Self::parse_upload_response(response, source_url).await
    }

    async fn url_exists(&self, url: &str) -> bool {
        // HEAD first; some CDN frontends reject it, so fall back to a
        // one-byte ranged GET on 405/403.
        match self.client.head(url).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response)
                if response.status() == reqwest::StatusCode::METHOD_NOT_ALLOWED
                    || response.status() == reqwest::StatusCode::FORBIDDEN =>
            {
                match self
                    .client
                    .get(url)
                    .header(reqwest::header::RANGE, "bytes=0-0")
                    .send()
                    .await
                {
                    Ok(ranged) => ranged.status().is_success(),
                    Err(e) => {
                        warn!("Ranged existence probe for {} failed: {}", url, e);
                        false
                    }
                }
            }
            Ok(_) => false,
            Err(e) => {
                warn!("Existence probe for {} failed: {}", url, e);
                false
            }
        }
    }

    fn name(&self) -> &str {
        "CDN API"
    }
}

/// Logging-only provider: mints fake URLs instead of uploading. Backs
/// `sync --dry-run` and the test suite. URLs it has minted (and any URL not
/// explicitly marked dead) always probe live.
pub struct NullCdnProvider {
    counter: AtomicUsize,
    uploads: Mutex<Vec<String>>,
    dead_urls: Mutex<HashSet<String>>,
}

impl NullCdnProvider {
    pub fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
            uploads: Mutex::new(Vec::new()),
            dead_urls: Mutex::new(HashSet::new()),
        }
    }

    /// Makes `url_exists` report the given URL as gone.
    pub fn mark_dead(&self, url: &str) {
        self.dead_urls.lock().unwrap().insert(url.to_string());
    }

    pub fn upload_count(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }

    pub fn uploaded_files(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    fn mint(&self, name: &str) -> UploadResult {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        UploadResult {
            id: Some(format!("null-{}", n)),
            url: format!("https://cdn.invalid/{}/{}", n, urlencoding::encode(name)),
        }
    }
}

impl Default for NullCdnProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CdnProvider for NullCdnProvider {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadResult, SyncError> {
        let result = self.mint(file_name);
        info!(
            "NULL CDN PROVIDER - would upload {} ({} bytes) -> {}",
            file_name,
            bytes.len(),
            result.url
        );
        self.uploads.lock().unwrap().push(file_name.to_string());
        Ok(result)
    }

    async fn upload_from_url(&self, source_url: &str) -> Result<UploadResult, SyncError> {
        let name = source_url.rsplit('/').next().unwrap_or("import");
        let result = self.mint(name);
        info!(
            "NULL CDN PROVIDER - would import {} -> {}",
            source_url, result.url
        );
        self.uploads.lock().unwrap().push(source_url.to_string());
        Ok(result)
    }

    async fn url_exists(&self, url: &str) -> bool {
        !self.dead_urls.lock().unwrap().contains(url)
    }

    fn name(&self) -> &str {
        "Null CDN Provider (Logging Only)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_provider_mints_unique_urls() {
        let provider = NullCdnProvider::new();
        let first = provider.upload("a.jpg", vec![1, 2, 3]).await.unwrap();
        let second = provider.upload("a.jpg", vec![1, 2, 3]).await.unwrap();

        assert_ne!(first.url, second.url);
        assert_eq!(provider.upload_count(), 2);
        assert_eq!(provider.uploaded_files(), vec!["a.jpg", "a.jpg"]);
    }

    #[tokio::test]
    async fn test_null_provider_liveness_and_mark_dead() {
        let provider = NullCdnProvider::new();
        let result = provider.upload("a.jpg", vec![0]).await.unwrap();

        assert!(provider.url_exists(&result.url).await);
        provider.mark_dead(&result.url);
        assert!(!provider.url_exists(&result.url).await);
    }

    #[tokio::test]
    async fn test_null_provider_upload_from_url() {
        let provider = NullCdnProvider::new();
        let result = provider
            .upload_from_url("https://example.com/pics/sunset.jpg")
            .await
            .unwrap();
        assert!(result.url.contains("sunset.jpg"));
        assert!(result.id.is_some());
    }
}
