use log::{debug, warn};

use super::Page;
use crate::services::GitService;
use crate::utils::naming::{is_attachment_path, strip_page_extension};

/// Which part of the repository a page listing covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope<'a> {
    /// Pages at the repository root only
    TopLevel,
    /// Every page in every directory
    All,
    /// Pages directly inside one directory
    Directory(&'a str),
}

/// Pages committed at HEAD, sorted by internal name.
///
/// Directories, attachment files and dotfiles are skipped. A repository
/// error gives an empty list.
pub fn list_pages<'g>(git: &'g GitService, scope: ListScope<'_>) -> Vec<Page<'g>> {
    let recursive = !matches!(scope, ListScope::TopLevel);
    let listing = match Page::list(git, recursive, None) {
        Ok(listing) => listing,
        Err(e) => {
            warn!("Could not list pages ({:?}): {}", scope, e);
            return Vec::new();
        }
    };

    let mut names: Vec<&str> = listing
        .iter()
        .filter(|(path, node)| !node.is_tree() && !is_attachment_path(path) && !is_hidden(path))
        .filter(|(path, _)| match scope {
            ListScope::Directory(dir) => parent_dir(path) == dir.trim_matches('/'),
            _ => true,
        })
        .map(|(path, _)| strip_page_extension(path))
        .collect();
    names.sort_unstable();
    names.dedup();

    debug!("Listed {} pages for {:?}", names.len(), scope);
    names.into_iter().map(|name| Page::new(git, name)).collect()
}

fn is_hidden(path: &str) -> bool {
    path.split('/').any(|segment| segment.starts_with('.'))
}

// `File.dirname` semantics: "." for top-level paths.
fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_dir_of_top_level_is_dot() {
        assert_eq!(parent_dir("a.md"), ".");
        assert_eq!(parent_dir("docs/a.md"), "docs");
        assert_eq!(parent_dir("docs/deep/a.md"), "docs/deep");
    }

    #[test]
    fn dotfiles_are_hidden() {
        assert!(is_hidden(".meta"));
        assert!(is_hidden("docs/.draft.md"));
        assert!(!is_hidden("docs/page.md"));
    }
}
