use crate::services::GitService;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub git: GitService,
}

/// Metadata for a single commit, detached from the libgit2 handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub id: String,
    pub short_id: String,
    pub author: String,
    pub email: String,
    /// RFC 3339 author date
    pub date: String,
    pub timestamp: i64,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Tree,
    Blob,
}

/// A tree-or-blob entry of a revision snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub id: String,
    pub kind: NodeKind,
}

impl TreeNode {
    pub fn is_tree(&self) -> bool {
        self.kind == NodeKind::Tree
    }
}

/// One line matched by a repository grep
#[derive(Debug, Clone)]
pub struct GrepMatch {
    pub path: String,
    pub line_number: usize,
    pub line: String,
}

/// Search result information
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub page: String,
    pub title: String,
    pub path: String,
    pub line_number: usize,
    pub excerpt: String,
}

/// Markdown rendering result
#[derive(Debug, Clone)]
pub struct MarkdownResult {
    pub html: String,
    pub toc: String,
    pub title: Option<String>,
}

/// Template rendering context
#[derive(Debug, Clone)]
pub struct TemplateContext {
    pub title: String,
    pub content: String,
    pub sidebar: String,
    pub fab: String,
}

/// Result of a mutating page or attachment operation.
///
/// The filesystem write has always happened by the time one of these is
/// returned; the variants only describe what became of the commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Commit created, carrying its id.
    Committed(String),
    /// File saved but staging or committing was rejected.
    CommitFailed(String),
    /// Nothing on disk matched, so nothing was written.
    Unchanged,
}

impl WriteOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, WriteOutcome::Committed(_))
    }
}
