//! Mapping between page titles, internal names and on-disk paths.
//!
//! Internal names are lowercase, underscore separated and slash delimited
//! (`team/release_notes`). Titles are the CamelCase display form
//! (`TeamReleaseNotes`). None of these functions fail: garbage in gives a
//! best-effort, possibly empty, name out.

/// Suffix appended to a page's internal name to form its file name.
pub const PAGE_FILE_EXT: &str = ".md";

/// Suffix appended to a page's internal name to form its attachment directory.
pub const ATTACH_DIR_SUFFIX: &str = "_files";

/// Internal name of the page shown for a bare directory.
pub const HOMEPAGE: &str = "home";

/// Normalize arbitrary text into an internal name.
///
/// Each slash-separated segment is split before every uppercase letter,
/// lowercased, and its alphanumeric runs are joined with underscores.
/// Empty segments are dropped, so `..` and leading slashes vanish.
pub fn normalize(input: &str) -> String {
    input
        .split('/')
        .map(normalize_segment)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

fn normalize_segment(segment: &str) -> String {
    let mut spaced = String::with_capacity(segment.len() * 2);
    for ch in segment.chars() {
        if ch.is_ascii_uppercase() {
            spaced.push(' ');
        }
        spaced.push(ch.to_ascii_lowercase());
    }
    spaced
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// CamelCase display title for an internal name (or any text).
pub fn titleize(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(capitalize)
        .collect()
}

fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Drop [`PAGE_FILE_EXT`] from the end of `filename`, once, if present.
pub fn strip_page_extension(filename: &str) -> &str {
    filename.strip_suffix(PAGE_FILE_EXT).unwrap_or(filename)
}

/// True for paths inside an attachment directory, e.g. `foo/bar_files/pic.png`.
pub fn is_attachment_path(path: &str) -> bool {
    path.contains(&format!("{}/", ATTACH_DIR_SUFFIX))
}

/// Internal name of the page owning an attachment directory (`foo/bar_files` -> `foo/bar`).
pub fn page_from_attachment_dir(dir: &str) -> &str {
    dir.trim_end_matches('/')
        .strip_suffix(ATTACH_DIR_SUFFIX)
        .unwrap_or(dir)
}

/// Nothing but whitespace.
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_titles_into_internal_names() {
        assert_eq!(normalize("My Page!!"), "my_page");
        assert_eq!(normalize("MyPage"), "my_page");
        assert_eq!(normalize("  release   notes 2024 "), "release_notes_2024");
        assert_eq!(normalize("Team/ReleaseNotes"), "team/release_notes");
    }

    #[test]
    fn normalize_drops_traversal_and_empty_segments() {
        assert_eq!(normalize("../../etc/passwd"), "etc/passwd");
        assert_eq!(normalize("/lead//trail/"), "lead/trail");
        assert_eq!(normalize("!!!"), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            "My Page!!",
            "HTTPServer config",
            "already_normal",
            "Mixed/Case/Path Name",
            "ünïcode Wörds",
            "trailing_ ",
            "a--b..c",
            "",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn titleize_builds_camel_case() {
        assert_eq!(titleize("my_page"), "MyPage");
        assert_eq!(titleize("baz qux"), "BazQux");
        assert_eq!(titleize("team/release_notes"), "TeamReleaseNotes");
        assert_eq!(titleize(""), "");
    }

    #[test]
    fn strips_page_extension_exactly_once() {
        let name = format!("notes{}", PAGE_FILE_EXT);
        assert_eq!(strip_page_extension(&name), "notes");
        assert_eq!(strip_page_extension(strip_page_extension(&name)), "notes");
        assert_eq!(strip_page_extension("image.png"), "image.png");
    }

    #[test]
    fn recognizes_attachment_paths() {
        assert!(is_attachment_path("foo_files/bar.jpg"));
        assert!(is_attachment_path("docs/foo_files/bar.jpg"));
        assert!(!is_attachment_path("foo_files"));
        assert!(!is_attachment_path("foo.md"));
        assert_eq!(page_from_attachment_dir("docs/foo_files"), "docs/foo");
        assert_eq!(page_from_attachment_dir("plain"), "plain");
    }
}
