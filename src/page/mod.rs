//! Wiki pages stored as files in the git working copy.
//!
//! A [`Page`] is built per request from a name and an optional revision.
//! Reads never fail: an unknown page or revision reads as empty. Writes
//! land on disk first and are then staged and committed; a rejected commit
//! is logged and reported through [`WriteOutcome`], never raised.

pub mod attachment;
pub mod listing;

use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use log::{debug, info, warn};

use crate::errors::WikiError;
use crate::services::{GitService, MarkdownService};
use crate::types::{CommitInfo, MarkdownResult, TreeNode, WriteOutcome};
use crate::utils::links::{convert_links_to_markup, normalize_links};
use crate::utils::naming::{
    is_blank, normalize, page_from_attachment_dir, titleize, ATTACH_DIR_SUFFIX, PAGE_FILE_EXT,
};

pub use attachment::Attachment;
pub use listing::{list_pages, ListScope};

pub struct Page<'g> {
    git: &'g GitService,
    basename: String,
    revision: Option<String>,
    raw_body: OnceCell<String>,
    commit: OnceCell<Option<CommitInfo>>,
}

impl<'g> Page<'g> {
    /// Page for `name` in the working copy; `name` may be any spelling.
    pub fn new(git: &'g GitService, name: &str) -> Self {
        Self::at_revision(git, name, None)
    }

    /// Page for `name`, pinned to `revision` when given.
    pub fn at_revision(git: &'g GitService, name: &str, revision: Option<&str>) -> Self {
        Self {
            git,
            basename: normalize(name),
            revision: revision.filter(|rev| !is_blank(rev)).map(str::to_string),
            raw_body: OnceCell::new(),
            commit: OnceCell::new(),
        }
    }

    /// The page owning attachment directory `dir` (`foo/bar_files` -> `foo/bar`).
    pub fn from_attachment_dir(git: &'g GitService, dir: &str) -> Self {
        Self::new(git, page_from_attachment_dir(dir))
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// Internal name, used for urls
    pub fn intname(&self) -> &str {
        &self.basename
    }

    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    /// CamelCase title
    pub fn title(&self) -> String {
        titleize(&self.basename)
    }

    /// Repository-relative file name, extension included
    pub fn filename(&self) -> String {
        format!("{}{}", self.basename, PAGE_FILE_EXT)
    }

    /// Directory part of the internal name, absent at the top level
    pub fn subwiki(&self) -> Option<&str> {
        self.basename.rsplit_once('/').map(|(dir, _)| dir)
    }

    pub fn path(&self) -> PathBuf {
        self.git.root().join(self.filename())
    }

    /// Repository-relative attachment directory name
    pub fn attachment_dir_name(&self) -> String {
        format!("{}{}", self.basename, ATTACH_DIR_SUFFIX)
    }

    pub fn attachment_dir(&self) -> PathBuf {
        self.git.root().join(self.attachment_dir_name())
    }

    pub(crate) fn git(&self) -> &'g GitService {
        self.git
    }

    /// Stored text: the working file, or the blob at the pinned revision.
    pub fn raw_body(&self) -> &str {
        self.raw_body.get_or_init(|| match &self.revision {
            Some(rev) => match self.git.blob_at(rev, &self.filename()) {
                Ok(Some(content)) => content,
                Ok(None) => String::new(),
                Err(e) => {
                    warn!("Could not read {} at {}: {}", self.filename(), rev, e);
                    String::new()
                }
            },
            None => fs::read_to_string(self.path()).unwrap_or_default(),
        })
    }

    /// Rendered HTML of the body, or the raw text if rendering fails
    pub fn body(&self) -> String {
        self.rendered().html
    }

    /// Rendered body with its table of contents
    pub fn rendered(&self) -> MarkdownResult {
        render_with_fallback(self.raw_body())
    }

    /// Render arbitrary text the way a stored body would be rendered
    pub fn preview(markdown: &str) -> String {
        render_with_fallback(markdown).html
    }

    /// Whether the page file is in the repository index
    pub fn is_tracked(&self) -> bool {
        self.git.is_tracked(&self.filename()).unwrap_or_else(|e| {
            warn!("Could not check whether {} is tracked: {}", self.filename(), e);
            false
        })
    }

    /// Write `content` (links normalized) and commit it.
    ///
    /// Only filesystem failures are errors; a rejected commit comes back
    /// as [`WriteOutcome::CommitFailed`] with the file already saved.
    pub fn update(&mut self, content: &str, message: Option<&str>) -> Result<WriteOutcome, WikiError> {
        let content = normalize_links(content);
        let git = self.git;
        let _guard = git.write_lock();

        let path = self.path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let verb = if self.is_tracked() { "edited" } else { "created" };
        fs::write(&path, &content)?;
        info!("Wrote {} ({} bytes)", self.filename(), content.len());
        self.forget();

        let mut commit_message = format!("{} {}", verb, self.title());
        if let Some(message) = message.filter(|m| !is_blank(m)) {
            commit_message.push_str(" : ");
            commit_message.push_str(message);
        }

        let filename = self.filename();
        let result = git.add(&filename).and_then(|_| git.commit(&commit_message));
        Ok(settle(result, &commit_message))
    }

    /// Add `text` after the current body, separated by a blank line.
    pub fn append(&mut self, text: &str) -> Result<WriteOutcome, WikiError> {
        let content = format!("{}\n\n{}", self.raw_body(), text);
        self.update(&content, None)
    }

    /// Remove the page file and its attachment directory, then commit.
    pub fn delete(&mut self) -> Result<WriteOutcome, WikiError> {
        let git = self.git;
        let _guard = git.write_lock();
        let path = self.path();
        if !path.exists() {
            debug!("Delete of {} skipped, no such file", self.filename());
            return Ok(WriteOutcome::Unchanged);
        }

        let attach_dir = self.attachment_dir();
        let attach_dir_exists = attach_dir.is_dir();
        if attach_dir_exists {
            fs::remove_dir_all(&attach_dir)?;
        }
        fs::remove_file(&path)?;
        info!("Removed {} (attachments: {})", self.filename(), attach_dir_exists);
        self.forget();

        let commit_message = format!("removed {}", self.title());
        let filename = self.filename();
        let attach_dir_name = self.attachment_dir_name();
        let result = git
            .remove(&filename, false)
            .and_then(|_| {
                if attach_dir_exists {
                    git.remove(&attach_dir_name, true)
                } else {
                    Ok(())
                }
            })
            .and_then(|_| git.commit(&commit_message));
        Ok(settle(result, &commit_message))
    }

    /// Commits that changed this page, newest first; absent when untracked.
    ///
    /// Not cached: every call walks the log again.
    pub fn history(&self) -> Option<Vec<CommitInfo>> {
        if !self.is_tracked() {
            return None;
        }
        match self.git.log(Some(&self.filename()), None) {
            Ok(history) => Some(history),
            Err(e) => {
                warn!("Could not read history of {}: {}", self.filename(), e);
                None
            }
        }
    }

    /// The last commit touching this page at or before the pinned revision
    pub fn commit(&self) -> Option<&CommitInfo> {
        self.commit
            .get_or_init(|| self.commit_at(self.revision.as_deref()))
            .as_ref()
    }

    /// The last commit touching this page at or before `revision` (HEAD when absent)
    pub fn commit_at(&self, revision: Option<&str>) -> Option<CommitInfo> {
        self.git
            .last_commit_for(&self.filename(), revision)
            .unwrap_or_else(|e| {
                warn!("Could not find commit for {}: {}", self.filename(), e);
                None
            })
    }

    /// Author date of [`Page::commit`]
    pub fn updated_at(&self) -> Option<String> {
        self.commit().map(|c| c.date.clone())
    }

    pub fn branch_name(&self) -> Option<String> {
        self.git.current_branch().ok()
    }

    /// Patch of this page between [`Page::commit`] and `revision`
    pub fn delta(&self, revision: &str) -> String {
        let Some(commit) = self.commit() else {
            return String::new();
        };
        self.git
            .diff(&commit.id, revision, Some(&self.filename()))
            .unwrap_or_else(|e| {
                warn!("Could not diff {} against {}: {}", self.filename(), revision, e);
                String::new()
            })
    }

    pub fn attachments(&self) -> Vec<Attachment> {
        Attachment::list(self)
    }

    /// Repository snapshot at HEAD as `path -> node`.
    ///
    /// Non-recursive lists only the immediate children of `dirname` (or the
    /// root); recursive descends into every subtree, keys being full paths.
    pub fn list(
        git: &GitService,
        recursive: bool,
        dirname: Option<&str>,
    ) -> Result<BTreeMap<String, TreeNode>, WikiError> {
        let dirname = dirname.map(|d| d.trim_matches('/')).filter(|d| !d.is_empty());
        let root = match dirname {
            Some(dir) => git.tree_at(None, dir)?,
            None => git.tree(None)?,
        };

        let mut listing = BTreeMap::new();
        let mut pending = Vec::new();
        for (name, node) in root {
            let path = match dirname {
                Some(dir) => format!("{}/{}", dir, name),
                None => name,
            };
            if recursive && node.is_tree() {
                pending.push((path.clone(), node.clone()));
            }
            listing.insert(path, node);
        }

        while let Some((dir, node)) = pending.pop() {
            for (name, child) in git.children(&node)? {
                let path = format!("{}/{}", dir, name);
                if child.is_tree() {
                    pending.push((path.clone(), child.clone()));
                }
                listing.insert(path, child);
            }
        }
        Ok(listing)
    }

    // Drop memoized reads after a write.
    fn forget(&mut self) {
        self.raw_body.take();
        self.commit.take();
    }
}

fn render_with_fallback(raw: &str) -> MarkdownResult {
    match MarkdownService::new().render_with_toc(&convert_links_to_markup(raw)) {
        Ok(result) => result,
        Err(e) => {
            warn!("Rendering failed, showing raw text: {}", e);
            MarkdownResult { html: raw.to_string(), toc: String::new(), title: None }
        }
    }
}

/// Turn a stage-and-commit result into a [`WriteOutcome`], logging failures.
pub(crate) fn settle(result: Result<String, WikiError>, message: &str) -> WriteOutcome {
    match result {
        Ok(id) => WriteOutcome::Committed(id),
        Err(e) => {
            warn!("Commit '{}' failed, keeping files on disk: {}", message, e);
            WriteOutcome::CommitFailed(e.to_string())
        }
    }
}
