use super::*;
use crate::errors::ApiError;
use crate::validation;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::runtime::Handle;

// Enough to get past any burst of same-name uploads within one millisecond.
const MAX_NAME_ATTEMPTS: usize = 1000;

pub struct LocalFileStorage {
    storage_path: PathBuf,
}

impl LocalFileStorage {
    /// Opens the upload directory, creating it if it is missing.
    pub fn new(storage_path: PathBuf) -> std::io::Result<Self> {
        if !storage_path.exists() {
            std::fs::create_dir_all(&storage_path)?;
        }
        Ok(Self { storage_path })
    }

    pub fn path(&self) -> &Path {
        &self.storage_path
    }

    /// Creates an empty file under `name`, bumping the token until the name is free.
    ///
    /// The returned file is removed again unless [`PendingFile::finish`] is called.
    pub async fn create(&self, name: StoredName) -> Result<PendingFile, ApiError> {
        let mut name = name;

        for _ in 0..MAX_NAME_ATTEMPTS {
            let stored_name = name.to_string();
            let path = self.storage_path.join(&stored_name);

            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => {
                    return Ok(PendingFile {
                        file,
                        path,
                        name: stored_name,
                        written: 0,
                        settled: false,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!(name = %stored_name, "stored name taken, retrying");
                    name = name.next();
                }
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "failed to create upload file");
                    return Err(ApiError::Internal);
                }
            }
        }

        tracing::error!("no free stored name after {MAX_NAME_ATTEMPTS} attempts");
        Err(ApiError::Internal)
    }

    /// Regular files in the upload directory, sorted by name.
    pub async fn list(&self) -> Result<Vec<FileEntry>, ApiError> {
        let mut entries = fs::read_dir(&self.storage_path).await.map_err(|e| {
            tracing::error!(path = %self.storage_path.display(), error = %e, "failed to read upload directory");
            ApiError::Internal
        })?;

        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            tracing::error!(error = %e, "failed to read upload directory entry");
            ApiError::Internal
        })? {
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();

            // Entries can vanish between read_dir and stat.
            match entry.metadata().await {
                Ok(meta) if meta.is_file() => files.push(FileEntry {
                    name: file_name.into_owned(),
                    size: meta.len(),
                }),
                Ok(_) => {}
                Err(e) => tracing::debug!(name = %file_name, error = %e, "skipping entry"),
            }
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Opens a stored file by its exact name. Hidden entries and anything that
    /// is not a regular file directly inside the directory are reported missing.
    pub async fn get(&self, name: &str) -> Result<FileContent, ApiError> {
        if !naming::is_servable(name) {
            return Err(ApiError::NotFound);
        }

        let file_path = self.storage_path.join(name);
        let meta = fs::symlink_metadata(&file_path)
            .await
            .map_err(|_| ApiError::NotFound)?;

        if !meta.is_file() {
            return Err(ApiError::NotFound);
        }

        let file = File::open(&file_path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => ApiError::NotFound,
            _ => {
                tracing::error!(path = %file_path.display(), error = %e, "failed to open stored file");
                ApiError::Internal
            }
        })?;

        Ok(FileContent {
            file,
            size: meta.len(),
            content_type: mime_guess::from_path(&file_path).first_or_octet_stream(),
            modified: meta.modified().ok(),
        })
    }
}

/// A file being written to the upload directory.
///
/// Error paths call [`discard`](Self::discard). If it is dropped without being
/// finished or discarded (the request was cancelled), the file is removed on
/// the blocking pool.
pub struct PendingFile {
    file: File,
    path: PathBuf,
    name: String,
    written: u64,
    settled: bool,
}

impl PendingFile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Appends a chunk, refusing it if the file would exceed the size limit.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), ApiError> {
        let written = self.written + chunk.len() as u64;
        validation::check_size(written)?;

        self.file.write_all(chunk).await.map_err(|e| {
            tracing::error!(path = %self.path.display(), error = %e, "failed to write upload");
            ApiError::Internal
        })?;
        self.written = written;
        Ok(())
    }

    /// Flushes the file to disk and keeps it.
    pub async fn finish(mut self) -> Result<StoredFile, ApiError> {
        if let Err(e) = self.file.sync_all().await {
            tracing::error!(path = %self.path.display(), error = %e, "failed to flush upload");
            self.remove().await;
            return Err(ApiError::Internal);
        }

        self.settled = true;
        Ok(StoredFile {
            name: self.name.clone(),
            size: self.written,
        })
    }

    /// Deletes whatever was written so far.
    pub async fn discard(mut self) {
        self.remove().await;
    }

    async fn remove(&mut self) {
        self.settled = true;
        match fs::remove_file(&self.path).await {
            Ok(()) => tracing::debug!(name = %self.name, "discarded partial upload"),
            Err(e) => log_remove_error(&self.path, e),
        }
    }
}

impl Drop for PendingFile {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let path = std::mem::take(&mut self.path);
        let remove = move || {
            if let Err(e) = std::fs::remove_file(&path) {
                log_remove_error(&path, e);
            }
        };
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(remove);
            }
            Err(_) => remove(),
        }
    }
}

fn log_remove_error(path: &Path, e: std::io::Error) {
    if e.kind() != ErrorKind::NotFound {
        tracing::warn!(path = %path.display(), error = %e, "failed to discard partial upload");
    }
}
