use crate::html;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("No file selected.")]
    NoFile,
    #[error("File extension not permitted: '{extension}'.")]
    ExtensionNotAllowed { extension: String },
    #[error("File too large: the limit is {} MB.", .limit / (1024 * 1024))]
    TooLarge { limit: u64 },
    #[error("Malformed upload: {0}")]
    Multipart(String),
    #[error("Unexpected field: {0}")]
    UnexpectedField(String),
    #[error("File not found")]
    NotFound,
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NoFile
            | ApiError::ExtensionNotAllowed { .. }
            | ApiError::TooLarge { .. }
            | ApiError::Multipart(_)
            | ApiError::UnexpectedField(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Html(html::error_page(&self.to_string()))).into_response()
    }
}
