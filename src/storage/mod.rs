mod local_fs;
pub mod naming;

pub use local_fs::{LocalFileStorage, PendingFile};
pub use naming::StoredName;

use mime::Mime;
use std::time::SystemTime;

/// A file that has been fully written to the upload directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub name: String,
    pub size: u64,
}

/// One regular file found in the upload directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
}

impl FileEntry {
    /// Size in KiB, rounded half up (1536 bytes is 2 KB, 1535 bytes is 1 KB).
    pub fn size_kib(&self) -> u64 {
        self.size.saturating_add(512) / 1024
    }
}

/// An opened stored file, ready to be streamed.
#[derive(Debug)]
pub struct FileContent {
    pub file: tokio::fs::File,
    pub size: u64,
    pub content_type: Mime,
    pub modified: Option<SystemTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(size: u64) -> FileEntry {
        FileEntry {
            name: "a.txt".to_string(),
            size,
        }
    }

    #[test]
    fn size_kib_rounds_half_up() {
        assert_eq!(entry(0).size_kib(), 0);
        assert_eq!(entry(511).size_kib(), 0);
        assert_eq!(entry(512).size_kib(), 1);
        assert_eq!(entry(1024).size_kib(), 1);
        assert_eq!(entry(1535).size_kib(), 1);
        assert_eq!(entry(1536).size_kib(), 2);
        assert_eq!(entry(2560).size_kib(), 3);
        assert_eq!(entry(10 * 1024 * 1024).size_kib(), 10240);
    }
}
