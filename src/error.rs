use std::io;

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::path::PathError;

#[derive(Debug, Error)]
pub enum WebError {
    #[error("admin login required")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("range not satisfiable for size {0}")]
    RangeNotSatisfiable(u64),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("multipart error: {0}")]
    Multipart(#[from] MultipartError),
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self {
            WebError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()).into_response(),
            WebError::NotFound => StatusCode::NOT_FOUND.into_response(),
            WebError::BadRequest(_) | WebError::Path(_) => {
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            WebError::RangeNotSatisfiable(size) => (
                StatusCode::RANGE_NOT_SATISFIABLE,
                [("Content-Range", format!("bytes */{size}"))],
            )
                .into_response(),
            WebError::Io(ref e) if e.kind() == io::ErrorKind::NotFound => {
                StatusCode::NOT_FOUND.into_response()
            }
            WebError::Multipart(e) => e.into_response(),
            WebError::Io(_) | WebError::Join(_) => {
                error!(error = %self, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
