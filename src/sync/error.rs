use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Manifest error: {0}")]
    ManifestError(#[from] crate::manifest::ManifestError),

    #[error("CDN request failed: {0}")]
    CdnError(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CDN upload failed for {path}: {message}")]
    UploadFailed { path: String, message: String },

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}
