//! `[[Wiki Link]]` rewriting.
//!
//! Markers are matched left to right without nesting: the inner text is
//! everything up to the first `]`, so `[[a]b]]` is not a marker at all.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::naming::{normalize, titleize};

static WIKI_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\]]+)\]\]").expect("wiki link pattern compiles"));

/// Canonicalize every marker's inner text to its CamelCase title, keeping the brackets.
///
/// Applied before content is written so different spellings of one link converge.
pub fn normalize_links(text: &str) -> String {
    WIKI_LINK
        .replace_all(text, |caps: &Captures| format!("[[{}]]", titleize(&caps[1])))
        .into_owned()
}

/// Replace every marker with a markdown link to `/<internal_name>`.
pub fn convert_links_to_markup(text: &str) -> String {
    WIKI_LINK
        .replace_all(text, |caps: &Captures| {
            let wiki_word = titleize(&caps[1]);
            markdown_link(&normalize(&wiki_word), &wiki_word)
        })
        .into_owned()
}

fn markdown_link(rel_url: &str, title: &str) -> String {
    format!("[{}](/{})", title, rel_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_link_spelling() {
        assert_eq!(normalize_links("see [[my page]] now"), "see [[MyPage]] now");
        assert_eq!(normalize_links("[[my_page]] and [[MyPage]]"), "[[MyPage]] and [[MyPage]]");
        assert_eq!(normalize_links("no links here"), "no links here");
    }

    #[test]
    fn converts_markers_to_markdown_links() {
        let converted = convert_links_to_markup(&normalize_links("[[my page]]"));
        assert_eq!(converted, "[MyPage](/my_page)");
    }

    #[test]
    fn conversion_is_idempotent() {
        let once = convert_links_to_markup("Hello [[Baz Qux]] and [[other]]");
        assert_eq!(convert_links_to_markup(&once), once);
    }

    #[test]
    fn first_closing_bracket_ends_the_marker() {
        // `[^\]]+` stops at the first `]`, so this never forms a marker.
        assert_eq!(convert_links_to_markup("[[a]b]]"), "[[a]b]]");
        // Two adjacent markers are matched separately.
        assert_eq!(
            convert_links_to_markup("[[one]][[two]]"),
            "[One](/one)[Two](/two)"
        );
    }

    #[test]
    fn empty_marker_is_left_alone() {
        assert_eq!(normalize_links("[[]]"), "[[]]");
    }
}
