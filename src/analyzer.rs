// src/analyzer.rs

use crate::error::{Error, Result};
use crate::model::{CommitEvent, FileChange, Timestamp};
use crate::rename::rename_annotation;
use git2::{Commit, Delta, Diff, DiffFindOptions, DiffOptions, Oid, Patch, Repository, Revwalk, Sort};
use std::path::Path;

/// Commit event source backed by a git repository.
pub struct GitHistory {
    repo: Repository,
    tip: Oid,
    pathspecs: Vec<String>,
}

impl GitHistory {
    /// Opens a local repository and resolves `branch` to its tip commit.
    pub fn open(path: &Path, branch: &str, content_paths: &[String]) -> Result<Self> {
        let repo = Repository::open(path).map_err(|e| {
            Error::configuration(format!("{} is not a git repository: {}", path.display(), e.message()))
        })?;
        Self::from_repo(repo, branch, content_paths)
    }

    /// Clones `url` at `branch` into `into`, which must be empty.
    pub fn clone_remote(url: &str, branch: &str, into: &Path, content_paths: &[String]) -> Result<Self> {
        tracing::info!(url, branch, "cloning remote repository");
        let repo = git2::build::RepoBuilder::new().branch(branch).clone(url, into)?;
        Self::from_repo(repo, branch, content_paths)
    }

    fn from_repo(repo: Repository, branch: &str, content_paths: &[String]) -> Result<Self> {
        let tip = resolve_branch(&repo, branch)?;
        Ok(Self {
            repo,
            tip,
            pathspecs: content_paths.to_vec(),
        })
    }

    pub fn workdir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    /// Short name of the checked-out branch, if HEAD is on one.
    pub fn head_branch(&self) -> Option<String> {
        let head = self.repo.head().ok()?;
        if !head.is_branch() {
            return None;
        }
        head.shorthand().map(String::from)
    }

    /// Oldest-first events for commits strictly later than `since`.
    pub fn events(&self, since: Timestamp) -> Result<CommitEvents<'_>> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.push(self.tip)?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME | Sort::REVERSE)?;
        Ok(CommitEvents {
            repo: &self.repo,
            revwalk,
            since,
            pathspecs: &self.pathspecs,
        })
    }
}

fn resolve_branch(repo: &Repository, branch: &str) -> Result<Oid> {
    let candidates = [branch.to_string(), format!("origin/{branch}")];
    for candidate in &candidates {
        if let Ok(obj) = repo.revparse_single(candidate) {
            return Ok(obj.peel_to_commit()?.id());
        }
    }
    Err(Error::configuration(format!("branch `{branch}` not found")))
}

/// Lazily diffs each commit against its first parent.
pub struct CommitEvents<'r> {
    repo: &'r Repository,
    revwalk: Revwalk<'r>,
    since: Timestamp,
    pathspecs: &'r [String],
}

impl Iterator for CommitEvents<'_> {
    type Item = Result<CommitEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let oid = match self.revwalk.next()? {
                Ok(oid) => oid,
                Err(e) => return Some(Err(e.into())),
            };
            let commit = match self.repo.find_commit(oid) {
                Ok(commit) => commit,
                Err(e) => return Some(Err(e.into())),
            };
            let timestamp = Timestamp::from_secs(commit.time().seconds());
            if timestamp <= self.since {
                continue;
            }
            return Some(self.event_for(&commit, timestamp));
        }
    }
}

impl CommitEvents<'_> {
    fn event_for(&self, commit: &Commit<'_>, timestamp: Timestamp) -> Result<CommitEvent> {
        let parent_tree = match commit.parent(0) {
            Ok(parent) => Some(parent.tree()?),
            Err(_) => None,
        };
        let current_tree = commit.tree()?;

        let mut diff_opts = DiffOptions::new();
        diff_opts.include_untracked(false);
        diff_opts.ignore_filemode(true);
        for spec in self.pathspecs {
            diff_opts.pathspec(spec);
        }

        let mut diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&current_tree), Some(&mut diff_opts))?;
        let mut find_opts = DiffFindOptions::new();
        find_opts.renames(true);
        diff.find_similar(Some(&mut find_opts))?;

        let changes = collect_changes(self.repo, &diff)?;
        tracing::trace!(commit = %commit.id(), files = changes.len(), "diffed commit");
        Ok(CommitEvent::new(timestamp, changes))
    }
}

fn collect_changes(repo: &Repository, diff: &Diff<'_>) -> Result<Vec<FileChange>> {
    let mut changes = Vec::with_capacity(diff.deltas().len());
    for idx in 0..diff.deltas().len() {
        let Some(delta) = diff.get_delta(idx) else {
            continue;
        };
        let old_path = delta.old_file().path().and_then(|p| p.to_str());
        let new_path = delta.new_file().path().and_then(|p| p.to_str());

        let path = match (delta.status(), old_path, new_path) {
            (Delta::Renamed, Some(old), Some(new)) => rename_annotation(old, new),
            (Delta::Deleted, Some(old), _) => old.to_string(),
            (_, _, Some(new)) => new.to_string(),
            (_, Some(old), None) => old.to_string(),
            (_, None, None) => continue,
        };

        let (insertions, deletions) = match Patch::from_diff(diff, idx)? {
            Some(patch) => {
                let (_, additions, deletions) = patch.line_stats()?;
                (additions as u64, deletions as u64)
            }
            None => (0, 0),
        };

        let lines = if delta.status() == Delta::Deleted {
            0
        } else {
            repo.find_blob(delta.new_file().id())
                .map_or(0, |blob| line_count(blob.content()))
        };

        changes.push(FileChange::new(path, insertions, deletions, lines));
    }
    Ok(changes)
}

/// Newline-terminated lines, plus a trailing unterminated one.
fn line_count(content: &[u8]) -> u64 {
    let newlines = content.iter().filter(|&&b| b == b'\n').count() as u64;
    match content.last() {
        Some(b'\n') | None => newlines,
        Some(_) => newlines + 1,
    }
}
