use std::io;
use axum::{http::StatusCode, response::{IntoResponse, Response}};
use thiserror::Error;

/// Custom error types for the wiki application
#[derive(Debug, Error)]
pub enum WikiError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Not found")]
    NotFound,

    #[error("Invalid path")]
    InvalidPath,

    /// The staged tree is identical to the parent commit's tree.
    #[error("Nothing to commit")]
    NothingToCommit,

    #[error("Search error: {0}")]
    SearchError(String),

    #[error("Render error: {0}")]
    RenderError(String),

    #[error("Upload error: {0}")]
    UploadError(String),

    #[error("Archive error: {0}")]
    ArchiveError(String),
}

impl IntoResponse for WikiError {
    fn into_response(self) -> Response {
        match self {
            WikiError::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            WikiError::InvalidPath => (StatusCode::BAD_REQUEST, "Invalid path").into_response(),
            WikiError::UploadError(e) => (
                StatusCode::BAD_REQUEST,
                format!("Upload error: {}", e),
            )
                .into_response(),
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                other.to_string(),
            )
                .into_response(),
        }
    }
}
