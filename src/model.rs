// src/model.rs

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::Bound;

/// Seconds since the Unix epoch. Totally ordered so it can key a `BTreeMap`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(f64);

impl Timestamp {
    /// 1900-01-01T00:00:00Z, older than any real commit.
    pub const SENTINEL: Timestamp = Timestamp(-2_208_988_800.0);

    pub fn new(secs: f64) -> Self {
        Timestamp(secs)
    }

    pub fn from_secs(secs: i64) -> Self {
        Timestamp(secs as f64)
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Utc.timestamp_opt(self.0.floor() as i64, 0).single() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339()),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Line counts of one change to one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDelta {
    pub insertions: u64,
    pub deletions: u64,
    /// Total lines in the file after the change.
    pub lines: u64,
}

impl LineDelta {
    pub fn new(insertions: u64, deletions: u64, lines: u64) -> Self {
        Self {
            insertions,
            deletions,
            lines,
        }
    }
}

/// Serialized form of one history entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub at: Timestamp,
    #[serde(flatten)]
    pub delta: LineDelta,
}

/// Changes keyed by timestamp, iterated in chronological order.
/// A second change at an existing timestamp replaces the first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<HistoryEntry>", into = "Vec<HistoryEntry>")]
pub struct History(BTreeMap<Timestamp, LineDelta>);

impl History {
    pub fn insert(&mut self, at: Timestamp, delta: LineDelta) {
        self.0.insert(at, delta);
    }

    pub fn get(&self, at: Timestamp) -> Option<&LineDelta> {
        self.0.get(&at)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Timestamp, &LineDelta)> {
        self.0.iter().map(|(at, delta)| (*at, delta))
    }

    /// Entries strictly later than `at`.
    pub fn after(&self, at: Timestamp) -> impl Iterator<Item = (Timestamp, &LineDelta)> {
        self.0
            .range((Bound::Excluded(at), Bound::Unbounded))
            .map(|(at, delta)| (*at, delta))
    }

    pub fn first(&self) -> Option<Timestamp> {
        self.0.keys().next().copied()
    }

    pub fn last(&self) -> Option<Timestamp> {
        self.0.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<HistoryEntry>> for History {
    fn from(entries: Vec<HistoryEntry>) -> Self {
        History(entries.into_iter().map(|e| (e.at, e.delta)).collect())
    }
}

impl From<History> for Vec<HistoryEntry> {
    fn from(history: History) -> Self {
        history
            .0
            .into_iter()
            .map(|(at, delta)| HistoryEntry { at, delta })
            .collect()
    }
}

/// Observed changes of one language variant of a basefile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revisions {
    /// Most recent path seen for this variant.
    pub filename: String,
    pub first_touched: Timestamp,
    pub last_touched: Timestamp,
    pub history: History,
}

impl Revisions {
    pub fn new(filename: impl Into<String>, at: Timestamp, delta: LineDelta) -> Self {
        let mut history = History::default();
        history.insert(at, delta);
        Self {
            filename: filename.into(),
            first_touched: at,
            last_touched: at,
            history,
        }
    }

    /// Records one change. The span is widened in both directions independently,
    /// so out-of-order replay still yields the true first and last touch.
    pub fn record(&mut self, filename: &str, at: Timestamp, delta: LineDelta) {
        if at >= self.last_touched {
            self.filename = filename.to_string();
        }
        self.first_touched = self.first_touched.min(at);
        self.last_touched = self.last_touched.max(at);
        self.history.insert(at, delta);
    }

    /// Folds a relocated record into this one. Entries already present win.
    pub fn absorb(&mut self, other: Revisions) {
        if other.last_touched > self.last_touched {
            self.filename = other.filename;
        }
        self.first_touched = self.first_touched.min(other.first_touched);
        self.last_touched = self.last_touched.max(other.last_touched);
        for (at, delta) in other.history.iter() {
            if self.history.get(at).is_none() {
                self.history.insert(at, *delta);
            }
        }
    }

    /// Total line count at the last touch.
    pub fn current_lines(&self) -> u64 {
        self.history
            .get(self.last_touched)
            .map_or(0, |delta| delta.lines)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Activity {
    /// Expected language with no commits yet.
    Untouched,
    Touched(Revisions),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Source,
    Open,
    Updated,
    Completed,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Source => "source",
            Status::Open => "open",
            Status::Updated => "updated",
            Status::Completed => "completed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageRecord {
    pub activity: Activity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl LanguageRecord {
    pub fn untouched() -> Self {
        Self {
            activity: Activity::Untouched,
            status: None,
        }
    }

    pub fn touched(revisions: Revisions) -> Self {
        Self {
            activity: Activity::Touched(revisions),
            status: None,
        }
    }

    pub fn revisions(&self) -> Option<&Revisions> {
        match &self.activity {
            Activity::Touched(revisions) => Some(revisions),
            Activity::Untouched => None,
        }
    }
}

/// All language variants of one basefile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cohort {
    languages: BTreeMap<String, LanguageRecord>,
}

impl Cohort {
    pub fn get(&self, language: &str) -> Option<&LanguageRecord> {
        self.languages.get(language)
    }

    pub fn get_mut(&mut self, language: &str) -> Option<&mut LanguageRecord> {
        self.languages.get_mut(language)
    }

    pub fn insert(&mut self, language: impl Into<String>, record: LanguageRecord) {
        self.languages.insert(language.into(), record);
    }

    pub fn remove(&mut self, language: &str) -> Option<LanguageRecord> {
        self.languages.remove(language)
    }

    pub fn contains(&self, language: &str) -> bool {
        self.languages.contains_key(language)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LanguageRecord)> {
        self.languages.iter().map(|(lang, record)| (lang.as_str(), record))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut LanguageRecord)> {
        self.languages
            .iter_mut()
            .map(|(lang, record)| (lang.as_str(), record))
    }

    /// Touched variants only.
    pub fn revisions(&self) -> impl Iterator<Item = (&str, &Revisions)> {
        self.iter()
            .filter_map(|(lang, record)| record.revisions().map(|rev| (lang, rev)))
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}

/// Basefile id to cohort. Mutated only by replay, read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    basefiles: BTreeMap<String, Cohort>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, basefile: &str) -> Option<&Cohort> {
        self.basefiles.get(basefile)
    }

    pub fn cohort_mut(&mut self, basefile: &str) -> &mut Cohort {
        self.basefiles.entry(basefile.to_string()).or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Cohort)> {
        self.basefiles.iter().map(|(base, cohort)| (base.as_str(), cohort))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Cohort)> {
        self.basefiles
            .iter_mut()
            .map(|(base, cohort)| (base.as_str(), cohort))
    }

    /// Detaches a record for relocation. A cohort left empty goes with it,
    /// since it no longer names any file.
    pub fn take(&mut self, basefile: &str, language: &str) -> Option<LanguageRecord> {
        let cohort = self.basefiles.get_mut(basefile)?;
        let record = cohort.remove(language)?;
        if cohort.is_empty() {
            self.basefiles.remove(basefile);
        }
        Some(record)
    }

    /// Every language with a record in any cohort.
    pub fn languages(&self) -> BTreeSet<String> {
        self.basefiles
            .values()
            .flat_map(|cohort| cohort.iter().map(|(lang, _)| lang.to_string()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.basefiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.basefiles.is_empty()
    }
}

/// One changed file within a commit. `path` keeps git's diffstat rename
/// notation (`dir/{old => new}/f.md`) when the change was a rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    pub delta: LineDelta,
}

impl FileChange {
    pub fn new(path: impl Into<String>, insertions: u64, deletions: u64, lines: u64) -> Self {
        Self {
            path: path.into(),
            delta: LineDelta::new(insertions, deletions, lines),
        }
    }
}

/// One commit as seen by the replay.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitEvent {
    pub timestamp: Timestamp,
    pub changes: Vec<FileChange>,
}

impl CommitEvent {
    pub fn new(timestamp: Timestamp, changes: Vec<FileChange>) -> Self {
        Self { timestamp, changes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: f64) -> Timestamp {
        Timestamp::new(secs)
    }

    #[test]
    fn record_widens_span_in_both_directions() {
        let mut rev = Revisions::new("content/en/a.md", ts(5.0), LineDelta::new(1, 0, 1));
        rev.record("content/en/a.md", ts(9.0), LineDelta::new(2, 0, 3));
        rev.record("content/en/a.md", ts(2.0), LineDelta::new(1, 0, 1));
        assert_eq!(rev.first_touched, ts(2.0));
        assert_eq!(rev.last_touched, ts(9.0));
        assert_eq!(rev.history.len(), 3);
        assert_eq!(rev.current_lines(), 3);
    }

    #[test]
    fn same_timestamp_overwrites_history_entry() {
        let mut rev = Revisions::new("a.md", ts(1.0), LineDelta::new(1, 0, 1));
        rev.record("a.md", ts(1.0), LineDelta::new(4, 1, 4));
        assert_eq!(rev.history.len(), 1);
        assert_eq!(rev.history.get(ts(1.0)), Some(&LineDelta::new(4, 1, 4)));
    }

    #[test]
    fn filename_follows_latest_touch_only() {
        let mut rev = Revisions::new("new.md", ts(5.0), LineDelta::default());
        rev.record("old.md", ts(3.0), LineDelta::default());
        assert_eq!(rev.filename, "new.md");
    }

    #[test]
    fn history_after_is_strict() {
        let mut history = History::default();
        for secs in [1.0, 2.0, 3.0] {
            history.insert(ts(secs), LineDelta::new(secs as u64, 0, 0));
        }
        let later: Vec<_> = history.after(ts(2.0)).map(|(at, _)| at).collect();
        assert_eq!(later, vec![ts(3.0)]);
    }

    #[test]
    fn take_drops_emptied_cohort() {
        let mut ledger = Ledger::new();
        ledger.cohort_mut("a.md").insert(
            "en",
            LanguageRecord::touched(Revisions::new("a.md", ts(1.0), LineDelta::default())),
        );
        assert!(ledger.take("a.md", "en").is_some());
        assert!(ledger.get("a.md").is_none());
        assert!(ledger.take("a.md", "en").is_none());
    }

    #[test]
    fn ledger_survives_json() {
        let mut ledger = Ledger::new();
        let mut rev = Revisions::new("content/fr/a.md", ts(1.5), LineDelta::new(2, 0, 2));
        rev.record("content/fr/a.md", ts(3.0), LineDelta::new(1, 1, 2));
        ledger.cohort_mut("a.md").insert("fr", LanguageRecord::touched(rev));
        ledger.cohort_mut("a.md").insert("ja", LanguageRecord::untouched());

        let json = serde_json::to_string(&ledger).unwrap();
        let back: Ledger = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ledger);
    }

    #[test]
    fn sentinel_predates_epoch() {
        assert!(Timestamp::SENTINEL < Timestamp::from_secs(0));
        assert_eq!(Timestamp::SENTINEL.to_string(), "1900-01-01T00:00:00+00:00");
    }
}
