use crate::errors::ApiError;
use crate::html;
use crate::storage::{LocalFileStorage, PendingFile, StoredFile, StoredName};
use crate::validation::{self, MAX_FILE_SIZE};
use axum::{
    body::Body,
    extract::{
        Extension, Multipart, Path,
        multipart::{Field, MultipartError, MultipartRejection},
        rejection::PathRejection,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use headers::{CacheControl, ContentLength, ContentType, HeaderMapExt, LastModified};
use std::{sync::Arc, time::Duration};
use tokio_util::io::ReaderStream;

/// Form field that carries the uploaded file.
pub const FILE_FIELD: &str = "myfile";

const DOWNLOAD_MAX_AGE: Duration = Duration::from_secs(60 * 60);

pub async fn index() -> Html<&'static str> {
    Html(html::INDEX_PAGE)
}

pub async fn upload(
    Extension(storage): Extension<Arc<LocalFileStorage>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Html<String>, ApiError> {
    let result = match multipart {
        Ok(multipart) => receive_upload(&storage, multipart).await,
        Err(rejection) => Err(ApiError::Multipart(rejection.body_text())),
    };

    match result {
        Ok(stored) => {
            tracing::info!(name = %stored.name, size = stored.size, "upload stored");
            Ok(Html(html::upload_success(&stored.name)))
        }
        Err(e) => {
            if matches!(e, ApiError::Internal) {
                tracing::error!("upload failed");
            } else {
                tracing::warn!(error = %e, "upload rejected");
            }
            Err(e)
        }
    }
}

/// Reads the whole form and keeps at most one file from the `myfile` field.
///
/// The file stays pending until the body has been consumed, so a later
/// unexpected part or a broken body still removes it.
async fn receive_upload(
    storage: &LocalFileStorage,
    mut multipart: Multipart,
) -> Result<StoredFile, ApiError> {
    let mut pending: Option<PendingFile> = None;

    match read_form(storage, &mut multipart, &mut pending).await {
        Ok(()) => pending.ok_or(ApiError::NoFile)?.finish().await,
        Err(e) => {
            if let Some(file) = pending {
                file.discard().await;
            }
            Err(e)
        }
    }
}

async fn read_form(
    storage: &LocalFileStorage,
    multipart: &mut Multipart,
    pending: &mut Option<PendingFile>,
) -> Result<(), ApiError> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        // Plain text fields are ignored.
        let Some(file_name) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let field_name = field.name().unwrap_or_default().to_owned();

        if field_name != FILE_FIELD || pending.is_some() {
            return Err(ApiError::UnexpectedField(field_name));
        }
        // Browsers send an empty part when the file input was left blank.
        if file_name.is_empty() {
            continue;
        }

        *pending = Some(receive_file(storage, &file_name, &mut field).await?);
    }

    Ok(())
}

async fn receive_file(
    storage: &LocalFileStorage,
    original_name: &str,
    field: &mut Field<'_>,
) -> Result<PendingFile, ApiError> {
    let name = StoredName::for_upload(original_name);
    validation::check_extension(&name)?;

    let mut file = storage.create(name).await?;
    if let Err(e) = copy_field(field, &mut file).await {
        file.discard().await;
        return Err(e);
    }

    tracing::debug!(original = original_name, stored = file.name(), size = file.written(), "received file");
    Ok(file)
}

async fn copy_field(field: &mut Field<'_>, file: &mut PendingFile) -> Result<(), ApiError> {
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        file.write_chunk(&chunk).await?;
    }
    Ok(())
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::TooLarge {
            limit: MAX_FILE_SIZE,
        }
    } else {
        ApiError::Multipart(e.body_text())
    }
}

pub async fn list_files(
    Extension(storage): Extension<Arc<LocalFileStorage>>,
) -> Result<Html<String>, ApiError> {
    let files = storage.list().await?;
    Ok(Html(html::file_list(&files)))
}

pub async fn download(
    name: Result<Path<String>, PathRejection>,
    Extension(storage): Extension<Arc<LocalFileStorage>>,
) -> Result<Response, ApiError> {
    let Ok(Path(name)) = name else {
        return Err(ApiError::NotFound);
    };
    let content = storage.get(&name).await?;

    let mut response = Body::from_stream(ReaderStream::new(content.file)).into_response();
    let headers = response.headers_mut();
    headers.typed_insert(ContentLength(content.size));
    headers.typed_insert(ContentType::from(content.content_type));
    headers.typed_insert(
        CacheControl::new()
            .with_public()
            .with_max_age(DOWNLOAD_MAX_AGE),
    );
    if let Some(modified) = content.modified {
        headers.typed_insert(LastModified::from(modified));
    }

    Ok(response)
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
