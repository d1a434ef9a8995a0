//! Upload rules: the extension allow-list and the size limit.

use crate::errors::ApiError;
use crate::storage::StoredName;

/// 10 MiB.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Room for multipart boundaries, headers and small text fields on top of the file.
pub const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub const ALLOWED_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".pdf", ".txt", ".zip"];

/// Largest request body accepted by the router.
pub const fn body_limit() -> usize {
    MAX_FILE_SIZE as usize + MULTIPART_OVERHEAD
}

/// Case-insensitive allow-list check; `ext` includes the leading dot.
pub fn is_extension_allowed(ext: &str) -> bool {
    ALLOWED_EXTENSIONS
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(ext))
}

pub fn check_extension(name: &StoredName) -> Result<(), ApiError> {
    if is_extension_allowed(name.extension()) {
        Ok(())
    } else {
        Err(ApiError::ExtensionNotAllowed {
            extension: name.extension().to_string(),
        })
    }
}

pub fn check_size(size: u64) -> Result<(), ApiError> {
    if size > MAX_FILE_SIZE {
        Err(ApiError::TooLarge {
            limit: MAX_FILE_SIZE,
        })
    } else {
        Ok(())
    }
}
