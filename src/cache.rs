// src/cache.rs

use crate::error::{Error, Result};
use crate::locale::Convention;
use crate::model::{Ledger, Timestamp};
use crate::targets::{normalize_extension, normalize_root};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Everything that decides which changes a replay records. A snapshot is
/// only resumed under identical settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaySettings {
    pub branch: String,
    pub convention: Convention,
    pub content_paths: BTreeSet<String>,
    pub extensions: BTreeSet<String>,
    /// Explicit language pool; `None` means ISO 639-1.
    pub languages: Option<BTreeSet<String>>,
}

impl ReplaySettings {
    pub fn new(
        branch: &str,
        convention: Convention,
        content_paths: &[String],
        extensions: &[String],
        languages: Option<&[String]>,
    ) -> Self {
        Self {
            branch: branch.to_string(),
            convention,
            content_paths: content_paths.iter().map(|p| normalize_root(p)).collect(),
            extensions: extensions.iter().map(|e| normalize_extension(e)).collect(),
            languages: languages.map(|codes| codes.iter().map(|c| c.trim().to_string()).collect()),
        }
    }
}

/// One persisted ledger and the replay boundary it covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u64,
    pub settings: ReplaySettings,
    pub watermark: Timestamp,
    pub ledger: Ledger,
}

/// Versioned snapshot store for one repository.
///
/// Files are named `v{version}-{written-at}.json`. Loading picks the highest
/// version; an unreadable file only costs a full replay.
pub struct SnapshotCache {
    dir: PathBuf,
    settings: ReplaySettings,
    latest: Option<(u64, PathBuf)>,
    loaded: Option<(Ledger, Timestamp)>,
}

impl SnapshotCache {
    pub fn new(cache_root: &Path, repo_name: &str, settings: ReplaySettings) -> Self {
        Self {
            dir: cache_root.join(repo_name),
            settings,
            latest: None,
            loaded: None,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Latest usable ledger and its watermark, or an empty ledger with the
    /// sentinel watermark.
    pub fn load(&mut self) -> Result<(Ledger, Timestamp)> {
        self.latest = latest_snapshot(&self.dir);
        let Some((version, path)) = self.latest.clone() else {
            tracing::info!(dir = %self.dir.display(), "no cached snapshot, replaying full history");
            return Ok((Ledger::new(), Timestamp::SENTINEL));
        };

        match read_snapshot(&path) {
            Ok(snapshot) if snapshot.settings != self.settings => {
                tracing::info!(
                    version,
                    cached_branch = %snapshot.settings.branch,
                    cached_convention = snapshot.settings.convention.as_str(),
                    "cached snapshot was built with other settings, ignoring it"
                );
                Ok((Ledger::new(), Timestamp::SENTINEL))
            }
            Ok(snapshot) => {
                tracing::info!(version, watermark = %snapshot.watermark, "resuming from cached snapshot");
                self.loaded = Some((snapshot.ledger.clone(), snapshot.watermark));
                Ok((snapshot.ledger, snapshot.watermark))
            }
            Err(err) if !err.is_fatal() => {
                tracing::warn!(error = %err, "falling back to full replay");
                Ok((Ledger::new(), Timestamp::SENTINEL))
            }
            Err(err) => Err(err),
        }
    }

    /// Persists `ledger`. An unchanged ledger keeps its version under a fresh
    /// write time; anything else becomes the next version. The file is written
    /// aside and renamed into place.
    pub fn save(&mut self, ledger: &Ledger, watermark: Timestamp) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let unchanged = self
            .loaded
            .as_ref()
            .is_some_and(|(l, w)| l == ledger && *w == watermark);
        let previous = self.latest.as_ref().map_or(0, |(v, _)| *v);
        let version = if unchanged { previous } else { previous + 1 };

        let written_at = chrono::Utc::now().timestamp();
        let path = self.dir.join(format!("v{version}-{written_at}.json"));
        let temp_path = self.dir.join(format!("v{version}-{written_at}.json.tmp"));

        let snapshot = Snapshot {
            version,
            settings: self.settings.clone(),
            watermark,
            ledger: ledger.clone(),
        };
        {
            let mut writer = BufWriter::new(File::create(&temp_path)?);
            serde_json::to_writer(&mut writer, &snapshot)?;
            writer.flush()?;
        }
        fs::rename(&temp_path, &path)?;

        if unchanged {
            if let Some((_, old)) = &self.latest {
                if old != &path {
                    fs::remove_file(old)?;
                }
            }
        }

        tracing::debug!(path = %path.display(), version, "snapshot saved");
        self.latest = Some((version, path.clone()));
        self.loaded = Some((ledger.clone(), watermark));
        Ok(path)
    }
}

/// Parses `v{version}-{written-at}.json`.
fn parse_name(name: &str) -> Option<(u64, i64)> {
    let stem = name.strip_prefix('v')?.strip_suffix(".json")?;
    let (version, written_at) = stem.split_once('-')?;
    Some((version.parse().ok()?, written_at.parse().ok()?))
}

fn latest_snapshot(dir: &Path) -> Option<(u64, PathBuf)> {
    let entries = fs::read_dir(dir).ok()?;
    entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name();
            let key = parse_name(name.to_str()?)?;
            Some((key, entry.path()))
        })
        .max_by_key(|(key, _)| *key)
        .map(|((version, _), path)| (version, path))
}

fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let corrupt = |reason: String| Error::CacheCorruption {
        path: path.display().to_string(),
        reason,
    };
    let file = File::open(path).map_err(|e| corrupt(e.to_string()))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| corrupt(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LanguageRecord, LineDelta, Revisions};

    fn sample_ledger() -> Ledger {
        let mut ledger = Ledger::new();
        ledger.cohort_mut("a.md").insert(
            "en",
            LanguageRecord::touched(Revisions::new(
                "content/en/a.md",
                Timestamp::from_secs(100),
                LineDelta::new(3, 0, 3),
            )),
        );
        ledger
    }

    fn settings(content_paths: &[&str]) -> ReplaySettings {
        let content_paths: Vec<String> = content_paths.iter().map(|p| p.to_string()).collect();
        ReplaySettings::new(
            "main",
            Convention::DirectorySegment,
            &content_paths,
            &[".md".to_string()],
            None,
        )
    }

    fn cache(root: &Path) -> SnapshotCache {
        SnapshotCache::new(root, "site", settings(&["content"]))
    }

    fn snapshot_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn empty_cache_yields_sentinel() {
        let root = tempfile::tempdir().unwrap();
        let (ledger, watermark) = cache(root.path()).load().unwrap();
        assert!(ledger.is_empty());
        assert_eq!(watermark, Timestamp::SENTINEL);
    }

    #[test]
    fn save_then_load_resumes() {
        let root = tempfile::tempdir().unwrap();
        let ledger = sample_ledger();
        let path = cache(root.path()).save(&ledger, Timestamp::from_secs(100)).unwrap();
        assert!(path.file_name().unwrap().to_str().unwrap().starts_with("v1-"));

        let (loaded, watermark) = cache(root.path()).load().unwrap();
        assert_eq!(loaded, ledger);
        assert_eq!(watermark, Timestamp::from_secs(100));
    }

    #[test]
    fn changed_ledger_bumps_version_unchanged_keeps_it() {
        let root = tempfile::tempdir().unwrap();
        let mut first = cache(root.path());
        first.load().unwrap();
        first.save(&sample_ledger(), Timestamp::from_secs(100)).unwrap();

        let mut second = cache(root.path());
        let (ledger, watermark) = second.load().unwrap();
        let kept = second.save(&ledger, watermark).unwrap();
        assert!(kept.file_name().unwrap().to_str().unwrap().starts_with("v1-"));
        assert_eq!(snapshot_files(second.dir()).len(), 1);

        let mut third = cache(root.path());
        let (mut ledger, _) = third.load().unwrap();
        ledger.cohort_mut("b.md").insert("en", LanguageRecord::untouched());
        let bumped = third.save(&ledger, Timestamp::from_secs(200)).unwrap();
        assert!(bumped.file_name().unwrap().to_str().unwrap().starts_with("v2-"));
    }

    #[test]
    fn corrupt_snapshot_falls_back_to_empty() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("site");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("v3-1700000000.json"), "{not json").unwrap();

        let mut cache = cache(root.path());
        let (ledger, watermark) = cache.load().unwrap();
        assert!(ledger.is_empty());
        assert_eq!(watermark, Timestamp::SENTINEL);

        let saved = cache.save(&sample_ledger(), Timestamp::from_secs(1)).unwrap();
        assert!(saved.file_name().unwrap().to_str().unwrap().starts_with("v4-"));
    }

    #[test]
    fn other_settings_are_ignored() {
        let root = tempfile::tempdir().unwrap();
        cache(root.path())
            .save(&sample_ledger(), Timestamp::from_secs(100))
            .unwrap();
        let suffix = ReplaySettings {
            convention: Convention::SuffixTag,
            ..settings(&["content"])
        };
        let widened = settings(&["content", "docs"]);
        let pooled = ReplaySettings {
            languages: Some(BTreeSet::from(["en".to_string()])),
            ..settings(&["content"])
        };
        for other in [suffix, widened, pooled] {
            let (ledger, watermark) = SnapshotCache::new(root.path(), "site", other).load().unwrap();
            assert!(ledger.is_empty());
            assert_eq!(watermark, Timestamp::SENTINEL);
        }
    }

    #[test]
    fn equivalent_spellings_share_a_snapshot() {
        let root = tempfile::tempdir().unwrap();
        cache(root.path())
            .save(&sample_ledger(), Timestamp::from_secs(100))
            .unwrap();
        let spelled = ReplaySettings::new(
            "main",
            Convention::DirectorySegment,
            &["./content/".to_string()],
            &["md".to_string()],
            None,
        );
        let (ledger, _) = SnapshotCache::new(root.path(), "site", spelled).load().unwrap();
        assert_eq!(ledger, sample_ledger());
    }

    #[test]
    fn snapshot_names_parse() {
        assert_eq!(parse_name("v12-1700000000.json"), Some((12, 1700000000)));
        assert_eq!(parse_name("v1-1.json.tmp"), None);
        assert_eq!(parse_name("notes.txt"), None);
    }
}
