use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use git2::build::CheckoutBuilder;
use git2::{
    Commit, DiffFormat, DiffOptions, ErrorCode, ObjectType, Oid, Repository, Signature, Sort,
    Tree, TreeWalkMode, TreeWalkResult,
};
use log::{debug, info, warn};
use regex::RegexBuilder;

use crate::config::Config;
use crate::errors::WikiError;
use crate::types::{CommitInfo, GrepMatch, NodeKind, TreeNode};
use crate::utils::format_timestamp;
use crate::utils::naming::is_blank;

const META_FILE: &str = ".meta";

/// Repository context shared by every page and attachment operation.
///
/// Holds only the working copy path and commit identity; the libgit2 handle
/// is reopened per call so the value stays `Send + Sync` and cheap to clone.
#[derive(Clone)]
pub struct GitService {
    root: PathBuf,
    author_name: String,
    author_email: String,
    write_lock: Arc<Mutex<()>>,
}

impl GitService {
    /// Create a service for an existing repository
    pub fn new(root: PathBuf, author_name: impl Into<String>, author_email: impl Into<String>) -> Self {
        debug!("Creating GitService for repository: {:?}", root);
        Self {
            root,
            author_name: author_name.into(),
            author_email: author_email.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Open the configured repository, creating and seeding it when missing
    pub fn open_or_init(config: &Config) -> Result<Self, WikiError> {
        let service = Self::new(
            config.repo_dir.clone(),
            config.author_name.clone(),
            config.author_email.clone(),
        );
        fs::create_dir_all(&service.root)?;

        let repo = match Repository::open(&service.root) {
            Ok(repo) => repo,
            Err(e) if e.code() == ErrorCode::NotFound => {
                info!("Initializing wiki repository at {:?}", service.root);
                Repository::init(&service.root)?
            }
            Err(e) => return Err(e.into()),
        };

        if resolve_commit(&repo, None)?.is_none() {
            service.touch_meta()?;
        }
        Ok(service)
    }

    /// Working copy root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Serialize a write-to-disk plus stage-and-commit sequence.
    pub fn write_lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn repo(&self) -> Result<Repository, WikiError> {
        Ok(Repository::open(&self.root)?)
    }

    // An unborn branch has nothing to commit, so seed it with a file naming the branch.
    fn touch_meta(&self) -> Result<(), WikiError> {
        let branch = self.current_branch()?;
        fs::write(self.root.join(META_FILE), format!("{}\n", branch))?;
        self.add(META_FILE)?;
        self.commit("initial commit")?;
        Ok(())
    }

    /// Name of the checked out branch, also for an unborn one
    pub fn current_branch(&self) -> Result<String, WikiError> {
        let repo = self.repo()?;
        match repo.head() {
            Ok(head) => Ok(head.shorthand().unwrap_or("HEAD").to_string()),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                let head = repo.find_reference("HEAD")?;
                Ok(head
                    .symbolic_target()
                    .map(|target| target.trim_start_matches("refs/heads/").to_string())
                    .unwrap_or_else(|| "master".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Id of the commit HEAD points at, absent on an unborn branch
    pub fn head_id(&self) -> Result<Option<String>, WikiError> {
        let repo = self.repo()?;
        Ok(resolve_commit(&repo, None)?.map(|commit| commit.id().to_string()))
    }

    /// Newest-first log starting at `revision` (HEAD when absent),
    /// optionally restricted to commits that change `path`.
    pub fn log(&self, path: Option<&str>, revision: Option<&str>) -> Result<Vec<CommitInfo>, WikiError> {
        self.walk(path, revision, None)
    }

    /// The last commit touching `path` at or before `revision`
    pub fn last_commit_for(&self, path: &str, revision: Option<&str>) -> Result<Option<CommitInfo>, WikiError> {
        Ok(self.walk(Some(path), revision, Some(1))?.into_iter().next())
    }

    fn walk(
        &self,
        path: Option<&str>,
        revision: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<CommitInfo>, WikiError> {
        let repo = self.repo()?;
        let Some(start) = resolve_commit(&repo, revision)? else {
            return Ok(Vec::new());
        };

        let mut revwalk = repo.revwalk()?;
        revwalk.push(start.id())?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;

        let mut commits = Vec::new();
        for oid in revwalk {
            if limit.is_some_and(|limit| commits.len() >= limit) {
                break;
            }
            let commit = repo.find_commit(oid?)?;
            if let Some(path) = path {
                if !commit_touches_path(&repo, &commit, path)? {
                    continue;
                }
            }
            commits.push(commit_info(&commit));
        }
        debug!("Walked log from {:?} for {:?}: {} commits", revision, path, commits.len());
        Ok(commits)
    }

    /// Text of the blob at `revision:path`, absent if either does not exist
    pub fn blob_at(&self, revision: &str, path: &str) -> Result<Option<String>, WikiError> {
        let repo = self.repo()?;
        let Some(commit) = resolve_commit(&repo, Some(revision))? else {
            return Ok(None);
        };
        let tree = commit.tree()?;
        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if entry.kind() != Some(ObjectType::Blob) {
            return Ok(None);
        }
        let blob = repo.find_blob(entry.id())?;
        Ok(Some(String::from_utf8_lossy(blob.content()).into_owned()))
    }

    /// Whether the index has an entry for `path`
    pub fn is_tracked(&self, path: &str) -> Result<bool, WikiError> {
        let repo = self.repo()?;
        let index = repo.index()?;
        Ok(index.get_path(Path::new(path), 0).is_some())
    }

    /// Stage a working copy file
    pub fn add(&self, path: &str) -> Result<(), WikiError> {
        let repo = self.repo()?;
        let mut index = repo.index()?;
        index.add_path(Path::new(path))?;
        index.write()?;
        debug!("Staged {}", path);
        Ok(())
    }

    /// Drop a path (or, recursively, a directory) from the index
    pub fn remove(&self, path: &str, recursive: bool) -> Result<(), WikiError> {
        let repo = self.repo()?;
        let mut index = repo.index()?;
        if recursive {
            index.remove_dir(Path::new(path), 0)?;
        } else {
            index.remove_path(Path::new(path))?;
        }
        index.write()?;
        debug!("Unstaged {} (recursive: {})", path, recursive);
        Ok(())
    }

    /// Commit the current index on HEAD, returning the new commit id.
    ///
    /// Fails with [`WikiError::NothingToCommit`] when the index matches HEAD.
    pub fn commit(&self, message: &str) -> Result<String, WikiError> {
        let repo = self.repo()?;
        let mut index = repo.index()?;
        let tree_id = index.write_tree()?;

        let parent = resolve_commit(&repo, None)?;
        if parent.as_ref().is_some_and(|p| p.tree_id() == tree_id) {
            return Err(WikiError::NothingToCommit);
        }

        let tree = repo.find_tree(tree_id)?;
        let sig = Signature::now(&self.author_name, &self.author_email)?;
        let parents: Vec<&Commit<'_>> = parent.iter().collect();
        let oid = repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;
        info!("Committed {}: {}", oid, message);
        Ok(oid.to_string())
    }

    /// Unified patch between two revisions, optionally for one path
    pub fn diff(&self, from: &str, to: &str, path: Option<&str>) -> Result<String, WikiError> {
        let repo = self.repo()?;
        let from_tree = resolve_commit(&repo, Some(from))?.ok_or(WikiError::NotFound)?.tree()?;
        let to_tree = resolve_commit(&repo, Some(to))?.ok_or(WikiError::NotFound)?.tree()?;

        let mut opts = DiffOptions::new();
        if let Some(path) = path {
            opts.pathspec(path).disable_pathspec_match(true);
        }
        let diff = repo.diff_tree_to_tree(Some(&from_tree), Some(&to_tree), Some(&mut opts))?;

        let mut patch = String::new();
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            let origin = line.origin();
            if matches!(origin, '+' | '-' | ' ') {
                patch.push(origin);
            }
            patch.push_str(&String::from_utf8_lossy(line.content()));
            true
        })?;
        Ok(patch)
    }

    /// Immediate children of the root tree at `revision` (HEAD when absent)
    pub fn tree(&self, revision: Option<&str>) -> Result<BTreeMap<String, TreeNode>, WikiError> {
        self.tree_at(revision, "")
    }

    /// Immediate children of directory `dir` at `revision`; empty when it is missing
    pub fn tree_at(&self, revision: Option<&str>, dir: &str) -> Result<BTreeMap<String, TreeNode>, WikiError> {
        let repo = self.repo()?;
        let Some(commit) = resolve_commit(&repo, revision)? else {
            return Ok(BTreeMap::new());
        };
        let root = commit.tree()?;
        let dir = dir.trim_matches('/');
        if dir.is_empty() {
            return Ok(tree_children(&root));
        }

        let entry = match root.get_path(Path::new(dir)) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        if entry.kind() != Some(ObjectType::Tree) {
            return Ok(BTreeMap::new());
        }
        let subtree = repo.find_tree(entry.id())?;
        Ok(tree_children(&subtree))
    }

    /// Children of a tree node; blobs have none
    pub fn children(&self, node: &TreeNode) -> Result<BTreeMap<String, TreeNode>, WikiError> {
        if !node.is_tree() {
            return Ok(BTreeMap::new());
        }
        let repo = self.repo()?;
        let tree = repo.find_tree(Oid::from_str(&node.id)?)?;
        Ok(tree_children(&tree))
    }

    /// Literal, line-based search over every text blob at HEAD
    pub fn grep(&self, pattern: &str, ignore_case: bool) -> Result<Vec<GrepMatch>, WikiError> {
        if is_blank(pattern) {
            return Ok(Vec::new());
        }
        let matcher = RegexBuilder::new(&regex::escape(pattern))
            .case_insensitive(ignore_case)
            .build()
            .map_err(|e| WikiError::SearchError(e.to_string()))?;

        let repo = self.repo()?;
        let Some(commit) = resolve_commit(&repo, None)? else {
            return Ok(Vec::new());
        };
        let tree = commit.tree()?;

        let mut blobs = Vec::new();
        tree.walk(TreeWalkMode::PreOrder, |dir, entry| {
            if entry.kind() == Some(ObjectType::Blob) {
                if let Some(name) = entry.name() {
                    blobs.push((format!("{}{}", dir, name), entry.id()));
                }
            }
            TreeWalkResult::Ok
        })?;

        let mut matches = Vec::new();
        for (path, id) in blobs {
            let blob = repo.find_blob(id)?;
            if blob.is_binary() {
                continue;
            }
            let content = String::from_utf8_lossy(blob.content());
            for (idx, line) in content.lines().enumerate() {
                if matcher.is_match(line) {
                    matches.push(GrepMatch {
                        path: path.clone(),
                        line_number: idx + 1,
                        line: line.to_string(),
                    });
                }
            }
        }
        debug!("grep '{}' matched {} lines", pattern, matches.len());
        Ok(matches)
    }

    /// Gzipped tarball of `revision`, every entry under `prefix`.
    ///
    /// libgit2 has no archiver, so this shells out to `git archive`.
    pub fn archive(&self, revision: &str, prefix: &str) -> Result<Vec<u8>, WikiError> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.root)
            .args(["archive", "--format=tar.gz"])
            .arg(format!("--prefix={}", prefix))
            .arg(revision)
            .output()
            .map_err(|e| WikiError::ArchiveError(format!("git archive: {}", e)))?;
        if !output.status.success() {
            return Err(WikiError::ArchiveError(format!(
                "git archive failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output.stdout)
    }

    /// Reset working copy and index to `revision` and commit that state on top of HEAD
    pub fn revert_to(&self, revision: &str) -> Result<String, WikiError> {
        let _guard = self.write_lock();
        let repo = self.repo()?;
        let target = resolve_commit(&repo, Some(revision))?.ok_or(WikiError::NotFound)?;

        let mut checkout = CheckoutBuilder::new();
        checkout.force();
        repo.checkout_tree(target.as_object(), Some(&mut checkout))?;

        let mut index = repo.index()?;
        index.read_tree(&target.tree()?)?;
        index.write()?;

        match self.commit("reverted branch") {
            Ok(id) => Ok(id),
            Err(e) => {
                warn!("Revert to {} did not commit: {}", revision, e);
                Err(e)
            }
        }
    }
}

/// HEAD (when `revision` is absent) or the commit a revision names; absent if unknown.
fn resolve_commit<'r>(repo: &'r Repository, revision: Option<&str>) -> Result<Option<Commit<'r>>, WikiError> {
    match revision {
        None => match repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?)),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        },
        Some(rev) => match repo.revparse_single(rev) {
            Ok(object) => Ok(Some(object.peel_to_commit()?)),
            Err(e)
                if matches!(
                    e.code(),
                    ErrorCode::NotFound | ErrorCode::Ambiguous | ErrorCode::InvalidSpec
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        },
    }
}

/// Whether `commit` changes `path` relative to its first parent
fn commit_touches_path(repo: &Repository, commit: &Commit<'_>, path: &str) -> Result<bool, WikiError> {
    let tree = commit.tree()?;
    let parent_tree = if commit.parent_count() > 0 {
        Some(commit.parent(0)?.tree()?)
    } else {
        None
    };

    let mut opts = DiffOptions::new();
    opts.pathspec(path).disable_pathspec_match(true);
    let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut opts))?;
    Ok(diff.deltas().len() > 0)
}

fn tree_children(tree: &Tree<'_>) -> BTreeMap<String, TreeNode> {
    tree.iter()
        .filter_map(|entry| {
            let name = entry.name()?.to_string();
            let kind = match entry.kind() {
                Some(ObjectType::Tree) => NodeKind::Tree,
                _ => NodeKind::Blob,
            };
            Some((name, TreeNode { id: entry.id().to_string(), kind }))
        })
        .collect()
}

fn commit_info(commit: &Commit<'_>) -> CommitInfo {
    let id = commit.id().to_string();
    let author = commit.author();
    let secs = author.when().seconds();
    CommitInfo {
        short_id: id.chars().take(7).collect(),
        id,
        author: author.name().unwrap_or("unknown").to_string(),
        email: author.email().unwrap_or("").to_string(),
        date: format_timestamp(secs),
        timestamp: secs,
        summary: commit.summary().unwrap_or("").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fresh() -> (TempDir, GitService) {
        let dir = TempDir::new().unwrap();
        let config = Config::with_custom(dir.path().to_path_buf(), None, None);
        let git = GitService::open_or_init(&config).unwrap();
        (dir, git)
    }

    #[test]
    fn init_seeds_a_first_commit() {
        let (_dir, git) = fresh();
        let log = git.log(None, None).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].summary, "initial commit");
        assert!(git.is_tracked(META_FILE).unwrap());
        assert_eq!(git.log(None, None).unwrap()[0].short_id.len(), 7);
    }

    #[test]
    fn reopening_does_not_add_commits() {
        let (dir, _git) = fresh();
        let config = Config::with_custom(dir.path().to_path_buf(), None, None);
        let git = GitService::open_or_init(&config).unwrap();
        assert_eq!(git.log(None, None).unwrap().len(), 1);
    }

    #[test]
    fn commit_without_changes_is_rejected() {
        let (_dir, git) = fresh();
        assert!(matches!(git.commit("empty"), Err(WikiError::NothingToCommit)));
    }

    #[test]
    fn reads_blobs_and_diffs_between_revisions() {
        let (dir, git) = fresh();
        fs::write(dir.path().join("a.md"), "one\n").unwrap();
        git.add("a.md").unwrap();
        let first = git.commit("first").unwrap();
        fs::write(dir.path().join("a.md"), "two\n").unwrap();
        git.add("a.md").unwrap();
        let second = git.commit("second").unwrap();

        assert_eq!(git.blob_at(&first, "a.md").unwrap().as_deref(), Some("one\n"));
        assert_eq!(git.blob_at(&second, "missing.md").unwrap(), None);

        let patch = git.diff(&first, &second, Some("a.md")).unwrap();
        assert!(patch.contains("-one"));
        assert!(patch.contains("+two"));

        let touching = git.log(Some("a.md"), None).unwrap();
        assert_eq!(touching.len(), 2);
        assert_eq!(touching[0].id, second);
        let pinned = git.last_commit_for("a.md", Some(&first)).unwrap().unwrap();
        assert_eq!(pinned.id, first);
    }

    #[test]
    fn unknown_revision_reads_as_absent() {
        let (_dir, git) = fresh();
        let bogus = "0123456789abcdef0123456789abcdef01234567";
        assert_eq!(git.blob_at(bogus, "a.md").unwrap(), None);
        assert!(git.log(None, Some(bogus)).unwrap().is_empty());
    }

    #[test]
    fn grep_is_case_insensitive_and_literal() {
        let (dir, git) = fresh();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/b.md"), "Hello World\nsecond (line)\n").unwrap();
        git.add("docs/b.md").unwrap();
        git.commit("docs").unwrap();

        let hits = git.grep("hello", true).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "docs/b.md");
        assert_eq!(hits[0].line_number, 1);
        assert_eq!(git.grep("(line)", true).unwrap().len(), 1);
        assert!(git.grep("hello", false).unwrap().is_empty());
        assert!(git.grep("   ", true).unwrap().is_empty());
    }

    #[test]
    fn revert_restores_an_older_tree() {
        let (dir, git) = fresh();
        let start = git.head_id().unwrap().unwrap();
        fs::write(dir.path().join("a.md"), "content").unwrap();
        git.add("a.md").unwrap();
        git.commit("add a").unwrap();

        git.revert_to(&start).unwrap();
        assert!(!dir.path().join("a.md").exists());
        assert!(!git.is_tracked("a.md").unwrap());
        assert_eq!(git.log(None, None).unwrap()[0].summary, "reverted branch");
    }
}
