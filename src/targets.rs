// src/targets.rs

use crate::error::{Error, Result};
use ignore::WalkBuilder;
use std::collections::BTreeSet;
use std::path::Path;

/// Where monitored files live: content roots and extensions. A path that
/// matched once stays monitored after it is renamed away or deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Scope {
    roots: Vec<String>,
    extensions: BTreeSet<String>,
}

impl Scope {
    fn new(content_paths: &[String], extensions: &[String]) -> Self {
        Self {
            roots: content_paths.iter().map(|p| normalize_root(p)).collect(),
            extensions: extensions.iter().map(|e| normalize_extension(e)).collect(),
        }
    }

    /// Same rule `discover` walks by: under a root, listed extension, and no
    /// hidden segment below the root.
    fn matches(&self, path: &str) -> bool {
        let Some(rest) = self.roots.iter().find_map(|root| {
            path.strip_prefix(root.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
        }) else {
            return false;
        };
        let segments: Vec<&str> = rest.split('/').collect();
        if segments.iter().any(|s| s.is_empty() || is_hidden(s)) {
            return false;
        }
        segments
            .last()
            .and_then(|name| name.rsplit_once('.'))
            .is_some_and(|(stem, ext)| !stem.is_empty() && self.extensions.contains(ext))
    }
}

/// Repository-relative, `/`-separated paths of the monitored files.
///
/// `contains` answers for files present in the working tree; `in_scope`
/// also accepts historical paths under the same roots and extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSet {
    paths: BTreeSet<String>,
    scope: Option<Scope>,
}

impl TargetSet {
    pub fn scoped<I, S>(paths: I, content_paths: &[String], extensions: &[String]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            scope: Some(Scope::new(content_paths, extensions)),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn in_scope(&self, path: &str) -> bool {
        self.contains(path) || self.scope.as_ref().is_some_and(|scope| scope.matches(path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for TargetSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().map(Into::into).collect(),
            scope: None,
        }
    }
}

/// Dotfiles and editor backups (`~` prefix) are never content.
fn is_hidden(name: &str) -> bool {
    name.starts_with('.') || name.starts_with('~')
}

pub(crate) fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_string()
}

/// `./content/` and `content` name the same root.
pub(crate) fn normalize_root(path: &str) -> String {
    let path = path.trim();
    path.strip_prefix("./").unwrap_or(path).trim_matches('/').to_string()
}

/// Walks every content root under `repo_root` and keeps the files whose
/// extension is listed.
pub fn discover(repo_root: &Path, content_paths: &[String], extensions: &[String]) -> Result<TargetSet> {
    let wanted: BTreeSet<String> = extensions.iter().map(|e| normalize_extension(e)).collect();
    let mut paths = BTreeSet::new();

    for content in content_paths {
        let root = repo_root.join(normalize_root(content));
        if !root.is_dir() {
            tracing::warn!(path = %root.display(), "content path is not a directory, skipping");
            continue;
        }

        let mut builder = WalkBuilder::new(&root);
        builder
            .standard_filters(false)
            .follow_links(false)
            .filter_entry(|entry| !entry.file_name().to_str().is_some_and(is_hidden));

        for entry in builder.build() {
            let entry = entry.map_err(|e| Error::Io(std::io::Error::other(e)))?;
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.path();
            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| wanted.contains(e));
            if !matches {
                continue;
            }
            let rel = path.strip_prefix(repo_root).unwrap_or(path);
            let rel = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            paths.insert(rel);
        }
    }

    tracing::debug!(count = paths.len(), "discovered target files");
    Ok(TargetSet::scoped(paths, content_paths, extensions))
}
