//! A small HTTP file-upload service.
//!
//! `POST /upload` stores one file from the `myfile` form field in the upload
//! directory, `GET /files` lists what is stored and `GET /uploads/{name}`
//! serves a stored file.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod html;
pub mod request_id;
pub mod storage;
pub mod validation;

use axum::{
    Router,
    body::Body,
    extract::{DefaultBodyLimit, Extension},
    http::Request,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use storage::LocalFileStorage;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;

pub fn app(storage: Arc<LocalFileStorage>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/upload", post(handlers::upload))
        .route("/files", get(handlers::list_files))
        .route("/uploads/{name}", get(handlers::download))
        .fallback(handlers::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(Extension(storage))
                .layer(middleware::from_fn(request_id::request_id_middleware))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|request: &Request<Body>| {
                            tracing::info_span!(
                                "http_request",
                                method = %request.method(),
                                uri = %request.uri(),
                                request_id = %request_id::request_id_of(request),
                            )
                        })
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(DefaultBodyLimit::max(validation::body_limit())),
        )
}
