// src/status.rs

use crate::model::{Activity, Cohort, LanguageRecord, Ledger, Status};
use std::collections::{BTreeMap, BTreeSet};

/// Adds an untouched placeholder for every expected language a cohort lacks.
pub fn ensure_languages(ledger: &mut Ledger, languages: &BTreeSet<String>) {
    for (_, cohort) in ledger.iter_mut() {
        for lang in languages {
            if !cohort.contains(lang) {
                cohort.insert(lang.clone(), LanguageRecord::untouched());
            }
        }
    }
}

/// Status of one target against its source. A target touched at the same
/// time as its source counts as keeping pace.
fn target_status(record: &LanguageRecord, source: &Cohort, source_lang: &str) -> Status {
    let Activity::Touched(target) = &record.activity else {
        return Status::Open;
    };
    match source.get(source_lang).and_then(LanguageRecord::revisions) {
        Some(src) if target.last_touched >= src.last_touched => Status::Completed,
        Some(_) => Status::Updated,
        None => Status::Open,
    }
}

/// Status Classifier: assigns a status to every record of every cohort with a
/// resolved source. Cohorts without a source keep no status.
pub fn classify_statuses(ledger: &mut Ledger, sources: &BTreeMap<String, String>) {
    for (basefile, cohort) in ledger.iter_mut() {
        let Some(source_lang) = sources.get(basefile) else {
            tracing::warn!(basefile, "no source language, statuses left unset");
            continue;
        };

        let statuses: Vec<(String, Status)> = cohort
            .iter()
            .map(|(lang, record)| {
                let status = if lang == source_lang {
                    Status::Source
                } else {
                    target_status(record, cohort, source_lang)
                };
                (lang.to_string(), status)
            })
            .collect();

        for (lang, status) in statuses {
            if let Some(record) = cohort.get_mut(&lang) {
                record.status = Some(status);
            }
        }
    }
}
