pub mod links;
pub mod naming;

use std::path::Path;

use time::OffsetDateTime;

/// Content type for a served attachment, by extension
pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|s| s.to_str()).map(|s| s.to_ascii_lowercase()) {
        Some(ref ext) if ext == "png" => "image/png",
        Some(ref ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ref ext) if ext == "gif" => "image/gif",
        Some(ref ext) if ext == "svg" => "image/svg+xml",
        Some(ref ext) if ext == "pdf" => "application/pdf",
        Some(ref ext) if ext == "txt" || ext == "md" => "text/plain; charset=utf-8",
        Some(ref ext) if ext == "json" => "application/json; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Escape HTML special characters
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Escape HTML attribute values
pub fn escape_attr(text: &str) -> String {
    escape_html(text)
}

/// Format a unix timestamp as RFC 3339, empty if out of range
pub fn format_timestamp(secs: i64) -> String {
    OffsetDateTime::from_unix_timestamp(secs)
        .ok()
        .and_then(|dt| dt.format(&time::format_description::well_known::Rfc3339).ok())
        .unwrap_or_default()
}

/// Normalize request path
pub fn normalize_path(path: &str) -> String {
    path.trim_matches('/').to_string()
}

/// True for a full 40 character hex commit id
pub fn is_revision(segment: &str) -> bool {
    segment.len() == 40 && segment.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn content_types_ignore_extension_case() {
        assert_eq!(content_type_for(Path::new("a/logo.PNG")), "image/png");
        assert_eq!(content_type_for(Path::new("notes.jpeg")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("blob")), "application/octet-stream");
    }

    #[test]
    fn formats_epoch() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn revision_ids_are_forty_hex_chars() {
        assert!(is_revision("0123456789abcdef0123456789abcdef01234567"));
        assert!(!is_revision("0123456"));
        assert!(!is_revision("z123456789abcdef0123456789abcdef01234567"));
    }
}
