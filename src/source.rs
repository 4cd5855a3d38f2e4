// src/source.rs

use crate::model::{Cohort, Ledger, Timestamp};
use std::collections::BTreeMap;

/// Picks the original language of one cohort: the earliest first touch.
///
/// Ties go to `default_language` when it is among them, otherwise to the
/// first tied language in code order. Untouched records never qualify.
pub fn resolve_source<'c>(cohort: &'c Cohort, default_language: &str) -> Option<&'c str> {
    let mut best: Option<(&str, Timestamp)> = None;
    for (lang, revisions) in cohort.revisions() {
        let ft = revisions.first_touched;
        best = match best {
            None => Some((lang, ft)),
            Some((_, best_ft)) if ft < best_ft => Some((lang, ft)),
            Some((_, best_ft)) if ft == best_ft && lang == default_language => Some((lang, ft)),
            keep => keep,
        };
    }
    best.map(|(lang, _)| lang)
}

/// Source Resolver: basefile id to source language, for every cohort with at
/// least one touched record.
pub fn resolve_sources(ledger: &Ledger, default_language: &str) -> BTreeMap<String, String> {
    ledger
        .iter()
        .filter_map(|(basefile, cohort)| {
            resolve_source(cohort, default_language)
                .map(|lang| (basefile.to_string(), lang.to_string()))
        })
        .collect()
}
