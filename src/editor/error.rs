use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unknown root: {0}")]
    UnknownRoot(String),

    #[error("Invalid collection details.")]
    InvalidName,

    #[error("Invalid media path.")]
    InvalidPath,

    #[error("Missing source file: {0}")]
    MissingSource(String),

    #[error("Duplicate source file in save request: {0}")]
    DuplicateSource(String),

    #[error("Not found.")]
    NotFound,
}

impl EditorError {
    fn status(&self) -> StatusCode {
        match self {
            EditorError::IoError(e) if e.kind() == std::io::ErrorKind::NotFound => {
                StatusCode::NOT_FOUND
            }
            EditorError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            EditorError::UnknownRoot(_)
            | EditorError::InvalidName
            | EditorError::InvalidPath
            | EditorError::MissingSource(_)
            | EditorError::DuplicateSource(_) => StatusCode::BAD_REQUEST,
            EditorError::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for EditorError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
