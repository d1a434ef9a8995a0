//! Turns an untrusted client filename into the name a file is stored under.
//!
//! A stored name is `base-token.ext`, where `token` is the upload time in
//! milliseconds since the Unix epoch. The name never contains a path separator
//! and never starts with a dot.

use sanitize_filename::{Options, sanitize_with_options};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Used when nothing usable survives sanitizing.
pub const FALLBACK_NAME: &str = "file";

const MAX_NAME_LEN: usize = 255;
// Longer "extensions" are treated as part of the base name.
const MAX_EXTENSION_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredName {
    base: String,
    extension: String,
    token: u64,
}

impl StoredName {
    /// Name for a file uploaded right now.
    pub fn for_upload(original: &str) -> Self {
        Self::with_token(original, now_millis())
    }

    pub fn with_token(original: &str, token: u64) -> Self {
        // Cleaned apart so a reserved base name like `aux` keeps its extension.
        let original = original.trim_end_matches(['.', ' ']);
        let (raw_base, raw_extension) = split_extension(original);
        let extension = sanitize_extension(raw_extension);

        let mut base = sanitize(raw_base);
        let budget = MAX_NAME_LEN
            .saturating_sub(extension.len())
            .saturating_sub(1 + token.to_string().len());
        truncate_on_char_boundary(&mut base, budget);

        Self {
            base,
            extension,
            token,
        }
    }

    /// Extension including the leading dot, or an empty string.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    /// The same name with the next token, used when the current one is taken.
    pub fn next(&self) -> Self {
        Self {
            base: self.base.clone(),
            extension: self.extension.clone(),
            token: self.token + 1,
        }
    }
}

impl fmt::Display for StoredName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}{}", self.base, self.token, self.extension)
    }
}

/// Strips characters that are unsafe on common filesystems, path separators
/// included, and drops leading dots so the result is never hidden or relative.
pub fn sanitize(original: &str) -> String {
    let cleaned = sanitize_with_options(
        original,
        Options {
            windows: true,
            truncate: false,
            replacement: "",
        },
    );

    let trimmed = cleaned.trim_start_matches(|c: char| c == '.' || c.is_whitespace());
    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Cleans an extension taken from the client name; `.` alone becomes empty.
pub fn sanitize_extension(extension: &str) -> String {
    let cleaned = sanitize_with_options(
        extension,
        Options {
            windows: true,
            truncate: false,
            replacement: "",
        },
    );

    if cleaned.len() > 1 && cleaned.starts_with('.') && !cleaned[1..].contains('.') {
        cleaned
    } else {
        String::new()
    }
}

/// Splits at the last dot. A dot in first position does not start an extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && name.len() - idx <= MAX_EXTENSION_LEN => name.split_at(idx),
        _ => (name, ""),
    }
}

/// Whether `name` may be served from the upload directory as-is.
pub fn is_servable(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
}

fn truncate_on_char_boundary(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_plain_names() {
        let name = StoredName::with_token("holiday photo.png", 1700000000000);
        assert_eq!(name.to_string(), "holiday photo-1700000000000.png");
        assert_eq!(name.extension(), ".png");
    }

    #[test]
    fn splits_at_last_dot() {
        let name = StoredName::with_token("archive.tar.zip", 42);
        assert_eq!(name.to_string(), "archive.tar-42.zip");
    }

    #[test]
    fn no_extension() {
        let name = StoredName::with_token("README", 7);
        assert_eq!(name.extension(), "");
        assert_eq!(name.to_string(), "README-7");
    }

    #[test]
    fn path_traversal_is_flattened() {
        let name = StoredName::with_token("../../etc/passwd.txt", 1);
        let stored = name.to_string();
        assert!(!stored.contains('/'));
        assert!(!stored.contains('\\'));
        assert!(!stored.starts_with('.'));
        assert_eq!(stored, "etcpasswd-1.txt");

        let windows = StoredName::with_token("..\\..\\boot.ini.txt", 1).to_string();
        assert!(!windows.contains('\\'));
        assert!(!windows.starts_with('.'));
    }

    #[test]
    fn unsafe_characters_are_removed() {
        assert_eq!(sanitize("re:port<1>?.pdf"), "report1.pdf");
        assert_eq!(sanitize("tab\there.txt"), "tabhere.txt");
    }

    #[test]
    fn empty_or_unsafe_only_falls_back() {
        assert_eq!(sanitize(""), FALLBACK_NAME);
        assert_eq!(sanitize("///"), FALLBACK_NAME);
        assert_eq!(sanitize(".."), FALLBACK_NAME);
        assert_eq!(sanitize("<>:|?*"), FALLBACK_NAME);
        assert_eq!(StoredName::with_token("", 5).to_string(), "file-5");
    }

    #[test]
    fn reserved_device_names_keep_extension() {
        assert_eq!(StoredName::with_token("aux.txt", 1).to_string(), "file-1.txt");
        assert_eq!(StoredName::with_token("con.pdf", 2).to_string(), "file-2.pdf");
        assert_eq!(StoredName::with_token("NUL.png", 3).to_string(), "file-3.png");
        assert_eq!(StoredName::with_token("com1.zip", 4).to_string(), "file-4.zip");
        assert_eq!(StoredName::with_token("<>.gif", 5).to_string(), "file-5.gif");
    }

    #[test]
    fn extension_is_cleaned() {
        assert_eq!(sanitize_extension(".txt"), ".txt");
        assert_eq!(sanitize_extension(".t:x*t"), ".txt");
        assert_eq!(sanitize_extension(".txt. "), ".txt");
        assert_eq!(sanitize_extension("."), "");
        assert_eq!(sanitize_extension(".<>"), "");
        assert_eq!(sanitize_extension(""), "");
        assert_eq!(StoredName::with_token("notes.txt. ", 1).to_string(), "notes-1.txt");
    }

    #[test]
    fn hidden_names_are_unhidden() {
        assert_eq!(sanitize(".env"), "env");
        assert_eq!(sanitize("...secret.txt"), "secret.txt");
        assert_eq!(StoredName::with_token(".env", 1).to_string(), "env-1");
        assert_eq!(
            StoredName::with_token("...secret.txt", 1).to_string(),
            "secret-1.txt"
        );
    }

    #[test]
    fn long_names_keep_extension_and_fit() {
        let original = format!("{}.jpeg", "a".repeat(400));
        let stored = StoredName::with_token(&original, 1700000000000).to_string();
        assert!(stored.len() <= MAX_NAME_LEN);
        assert!(stored.ends_with("-1700000000000.jpeg"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let original = format!("{}.txt", "é".repeat(200));
        let stored = StoredName::with_token(&original, 1700000000000).to_string();
        assert!(stored.len() <= MAX_NAME_LEN);
        assert!(stored.ends_with(".txt"));
    }

    #[test]
    fn next_bumps_token() {
        let name = StoredName::with_token("a.txt", 99);
        let next = name.next();
        assert_eq!(next.token(), 100);
        assert_eq!(next.to_string(), "a-100.txt");
    }

    #[test]
    fn servable_names() {
        assert!(is_servable("a-1.txt"));
        assert!(!is_servable(""));
        assert!(!is_servable(".env"));
        assert!(!is_servable("../a.txt"));
        assert!(!is_servable("dir/a.txt"));
        assert!(!is_servable("dir\\a.txt"));
    }

    #[test]
    fn token_is_current_time() {
        let before = now_millis();
        let name = StoredName::for_upload("a.txt");
        assert!(name.token() >= before);
    }
}
