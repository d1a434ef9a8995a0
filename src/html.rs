//! HTML fragments returned by the handlers.

use crate::storage::{FileEntry, naming};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

pub const INDEX_PAGE: &str = include_str!("../public/index.html");

// Same set JavaScript's encodeURIComponent leaves alone.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Download path for a stored file.
pub fn download_href(name: &str) -> String {
    format!("/uploads/{}", utf8_percent_encode(name, URI_COMPONENT))
}

pub fn upload_success(name: &str) -> String {
    format!(
        "<p>Upload complete: <a href=\"{href}\">{name}</a></p>\n\
         <p><a href=\"/\">Back to the upload form</a></p>\n\
         <p><a href=\"/files\">View all files</a></p>\n",
        href = escape(&download_href(name)),
        name = escape(name),
    )
}

pub fn file_list(entries: &[FileEntry]) -> String {
    let items = if entries.is_empty() {
        "<li>No files.</li>".to_string()
    } else {
        entries
            .iter()
            .map(|entry| {
                let name = escape(&entry.name);
                let kib = entry.size_kib();
                // Hidden files are listed but cannot be downloaded, so they get no link.
                if naming::is_servable(&entry.name) {
                    format!(
                        "<li><a href=\"{href}\" target=\"_blank\">{name}</a> - {kib} KB</li>",
                        href = escape(&download_href(&entry.name)),
                    )
                } else {
                    format!("<li>{name} - {kib} KB</li>")
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!("<h2>Uploaded files</h2>\n<ul>{items}</ul>\n<p><a href=\"/\">Back</a></p>\n")
}

pub fn error_page(message: &str) -> String {
    format!(
        "<p>Error: {}</p><p><a href=\"/\">Back</a></p>",
        escape(message)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape("<b>\"Tom\" & 'Jerry'</b>"),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn href_is_percent_encoded() {
        assert_eq!(download_href("a b&c-1.txt"), "/uploads/a%20b%26c-1.txt");
        assert_eq!(download_href("résumé-1.pdf"), "/uploads/r%C3%A9sum%C3%A9-1.pdf");
        assert_eq!(download_href("it's(1).txt"), "/uploads/it's(1).txt");
    }

    #[test]
    fn empty_listing() {
        let page = file_list(&[]);
        assert!(page.contains("<li>No files.</li>"));
    }

    #[test]
    fn listing_shows_names_and_sizes() {
        let page = file_list(&[
            FileEntry {
                name: "a-1.txt".into(),
                size: 1536,
            },
            FileEntry {
                name: "b-2.png".into(),
                size: 100,
            },
        ]);
        assert!(page.contains("<a href=\"/uploads/a-1.txt\" target=\"_blank\">a-1.txt</a> - 2 KB"));
        assert!(page.contains("b-2.png</a> - 0 KB"));
        assert_eq!(page.matches("<li>").count(), 2);
    }

    #[test]
    fn hidden_entries_have_no_link() {
        let page = file_list(&[FileEntry {
            name: ".env".into(),
            size: 2048,
        }]);
        assert!(page.contains("<li>.env - 2 KB</li>"));
        assert!(!page.contains("href=\"/uploads/"));
    }

    #[test]
    fn error_page_links_back() {
        let page = error_page("No <file>");
        assert!(page.contains("No &lt;file&gt;"));
        assert!(page.contains("<a href=\"/\">"));
    }

    #[test]
    fn index_has_upload_form() {
        assert!(INDEX_PAGE.contains("action=\"/upload\""));
        assert!(INDEX_PAGE.contains("name=\"myfile\""));
    }
}
