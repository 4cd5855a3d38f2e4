// src/report.rs

use crate::model::{Ledger, Revisions, Status};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A share of the source file. `Zero` is a conventional zero, not a computed
/// ratio, and renders without a decimal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Percent {
    Zero,
    Ratio(f64),
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Percent::Zero => f.write_str("0%"),
            Percent::Ratio(ratio) => write!(f, "{:.1}%", ratio * 100.0),
        }
    }
}

impl Serialize for Percent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LanguageStats {
    pub total: usize,
    pub open: usize,
    pub updated: usize,
    pub completed: usize,
}

/// Per-language counts of target statuses. Source records are not counted,
/// but a language that is only ever a source still gets a zero row.
pub fn stats(ledger: &Ledger) -> BTreeMap<String, LanguageStats> {
    let mut stats: BTreeMap<String, LanguageStats> = BTreeMap::new();
    for (_, cohort) in ledger.iter() {
        for (lang, record) in cohort.iter() {
            let entry = stats.entry(lang.to_string()).or_default();
            let counter = match record.status {
                Some(Status::Open) => &mut entry.open,
                Some(Status::Updated) => &mut entry.updated,
                Some(Status::Completed) => &mut entry.completed,
                Some(Status::Source) | None => continue,
            };
            *counter += 1;
            entry.total += 1;
        }
    }
    stats
}

/// (percent completed, percent updated) of one target against its source.
pub fn percentages(status: Status, source: &Revisions, target: Option<&Revisions>) -> (Percent, Percent) {
    let source_lines = source.current_lines();
    if source_lines == 0 {
        return (Percent::Ratio(1.0), Percent::Zero);
    }
    let share = |lines: u64| Percent::Ratio(lines as f64 / source_lines as f64);

    match (status, target) {
        (Status::Open, _) | (_, None) => (Percent::Zero, Percent::Ratio(1.0)),
        (Status::Completed, Some(target)) => (share(target.current_lines()), Percent::Zero),
        (_, Some(target)) => {
            if target.last_touched >= source.last_touched {
                return (share(target.current_lines()), Percent::Zero);
            }
            let inserted: u64 = source
                .history
                .after(target.last_touched)
                .map(|(_, delta)| delta.insertions)
                .sum();
            (share(target.current_lines()), share(inserted))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailRow {
    pub basefile: String,
    pub status: Status,
    pub source_language: String,
    pub word_count: usize,
    pub target_language: String,
    pub percent_completed: Percent,
    pub percent_updated: Percent,
}

/// Builds the per-target detail rows, optionally filtered by language.
pub struct Reporter {
    repo_root: PathBuf,
    source_filter: Option<String>,
    target_filter: Option<String>,
}

impl Reporter {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            source_filter: None,
            target_filter: None,
        }
    }

    pub fn with_filters(mut self, source: Option<String>, target: Option<String>) -> Self {
        self.source_filter = source;
        self.target_filter = target;
        self
    }

    pub fn details(&self, ledger: &Ledger) -> Vec<DetailRow> {
        let mut rows = Vec::new();
        for (basefile, cohort) in ledger.iter() {
            let Some((source_lang, source)) = cohort
                .iter()
                .find(|(_, record)| record.status == Some(Status::Source))
                .and_then(|(lang, record)| record.revisions().map(|rev| (lang, rev)))
            else {
                continue;
            };
            if self.source_filter.as_deref().is_some_and(|f| f != source_lang) {
                continue;
            }
            let words = self.word_count(&source.filename);

            for (lang, record) in cohort.iter() {
                let Some(status) = record.status else {
                    continue;
                };
                if status == Status::Source
                    || self.target_filter.as_deref().is_some_and(|f| f != lang)
                {
                    continue;
                }
                let (percent_completed, percent_updated) =
                    percentages(status, source, record.revisions());
                rows.push(DetailRow {
                    basefile: basefile.to_string(),
                    status,
                    source_language: source_lang.to_string(),
                    word_count: words,
                    target_language: lang.to_string(),
                    percent_completed,
                    percent_updated,
                });
            }
        }
        rows
    }

    fn word_count(&self, rel: &str) -> usize {
        match word_count(&self.repo_root.join(rel)) {
            Ok(count) => count,
            Err(err) => {
                tracing::warn!(path = rel, error = %err, "cannot read source file, word count set to 0");
                0
            }
        }
    }
}

/// Space-separated tokens per line, skipping empty lines.
pub fn count_words(text: &str) -> usize {
    text.lines()
        .filter(|line| !line.is_empty())
        .map(|line| line.split(' ').count())
        .sum()
}

pub fn word_count(path: &Path) -> io::Result<usize> {
    Ok(count_words(&fs::read_to_string(path)?))
}
