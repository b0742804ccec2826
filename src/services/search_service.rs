use log::{debug, info, warn};

use crate::services::GitService;
use crate::types::SearchResult;
use crate::utils::naming::{is_attachment_path, strip_page_extension, titleize};

const EXCERPT_CHARS: usize = 200;

/// Service for handling search operations
pub struct SearchService<'g> {
    git: &'g GitService,
}

impl<'g> SearchService<'g> {
    /// Create a new search service
    pub fn new(git: &'g GitService) -> Self {
        Self { git }
    }

    /// Case-insensitive free-text search over the latest commit.
    ///
    /// Any repository failure yields an empty result set.
    pub fn search(&self, query: &str) -> Vec<SearchResult> {
        let query = query.trim();
        if query.is_empty() {
            debug!("Empty search query received");
            return Vec::new();
        }

        info!("Starting search for query: '{}'", query);
        let start_time = std::time::Instant::now();

        let matches = match self.git.grep(query, true) {
            Ok(matches) => matches,
            Err(e) => {
                warn!("Search for '{}' failed, returning no results: {}", query, e);
                return Vec::new();
            }
        };

        let results: Vec<SearchResult> = matches
            .into_iter()
            .filter(|m| !is_attachment_path(&m.path) && !m.path.starts_with('.'))
            .map(|m| {
                let page = strip_page_extension(&m.path).to_string();
                SearchResult {
                    title: titleize(&page),
                    page,
                    path: m.path,
                    line_number: m.line_number,
                    excerpt: excerpt(&m.line),
                }
            })
            .collect();

        info!(
            "Search completed in {:?}ms, found {} results",
            start_time.elapsed().as_millis(),
            results.len()
        );
        results
    }
}

fn excerpt(line: &str) -> String {
    let trimmed = line.trim();
    if trimmed.chars().count() > EXCERPT_CHARS {
        let truncated: String = trimmed.chars().take(EXCERPT_CHARS).collect();
        format!("{}...", truncated)
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_lines_are_truncated_on_char_boundaries() {
        let line = "é".repeat(EXCERPT_CHARS + 10);
        let cut = excerpt(&line);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), EXCERPT_CHARS + 3);
        assert_eq!(excerpt("  short  "), "short");
    }
}
