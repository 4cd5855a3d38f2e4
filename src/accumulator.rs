// src/accumulator.rs

use crate::error::Result;
use crate::locale::Classifier;
use crate::model::*;
use crate::rename::resolve_rename;
use crate::targets::TargetSet;

/// A change record that passed resolution and classification.
struct Resolved {
    path: String,
    basefile: String,
    language: String,
    /// Basefile and language of the pre-rename path, when it classifies.
    moved_from: Option<(String, String)>,
    delta: LineDelta,
}

/// History Accumulator: replays commit events into a ledger.
///
/// Events are consumed one at a time and never revisited, so the accumulator
/// works on a one-shot stream. It can be seeded with a cached ledger, in which
/// case it must only see events later than that ledger's watermark.
pub struct Accumulator<'a> {
    classifier: &'a Classifier,
    targets: &'a TargetSet,
    ledger: Ledger,
    watermark: Timestamp,
    replayed: usize,
}

impl<'a> Accumulator<'a> {
    pub fn new(classifier: &'a Classifier, targets: &'a TargetSet) -> Self {
        Self::resume(Ledger::new(), Timestamp::SENTINEL, classifier, targets)
    }

    pub fn resume(
        ledger: Ledger,
        watermark: Timestamp,
        classifier: &'a Classifier,
        targets: &'a TargetSet,
    ) -> Self {
        Self {
            classifier,
            targets,
            ledger,
            watermark,
            replayed: 0,
        }
    }

    /// Applies one commit. Every change is resolved and classified before the
    /// ledger is touched, so a failing event leaves no partial trace.
    pub fn apply(&mut self, event: &CommitEvent) -> Result<()> {
        let mut resolved = Vec::with_capacity(event.changes.len());
        for change in &event.changes {
            let (original, renamed) = resolve_rename(&change.path)?;
            let path = renamed.as_deref().unwrap_or(&original);
            if !self.targets.in_scope(path) {
                continue;
            }
            let (basefile, language) = match self.classifier.classify(path) {
                Ok(classified) => classified,
                Err(err) if !self.targets.contains(path) => {
                    tracing::debug!(path, error = %err, "skipping unclassifiable path gone from the tree");
                    continue;
                }
                Err(err) => return Err(err),
            };
            let moved_from = match renamed {
                Some(_) => self.classifier.classify(&original).ok(),
                None => None,
            };
            resolved.push(Resolved {
                path: path.to_string(),
                basefile,
                language,
                moved_from,
                delta: change.delta,
            });
        }

        for change in resolved {
            if let Some((from_base, from_lang)) = &change.moved_from {
                self.relocate(from_base, from_lang, &change);
            }
            self.record(&change, event.timestamp);
        }

        self.watermark = self.watermark.max(event.timestamp);
        self.replayed += 1;
        Ok(())
    }

    /// Moves an existing record to the basefile of its renamed path, keeping
    /// its first touch.
    fn relocate(&mut self, from_base: &str, from_lang: &str, to: &Resolved) {
        if from_base == to.basefile && from_lang == to.language {
            return;
        }
        let Some(record) = self.ledger.take(from_base, from_lang) else {
            return;
        };
        let Activity::Touched(mut moved) = record.activity else {
            return;
        };
        tracing::debug!(
            from = %format!("{from_base}/{from_lang}"),
            to = %format!("{}/{}", to.basefile, to.language),
            "relocating renamed file"
        );
        moved.filename = to.path.clone();

        let cohort = self.ledger.cohort_mut(&to.basefile);
        match cohort.get_mut(&to.language) {
            Some(LanguageRecord {
                activity: Activity::Touched(existing),
                ..
            }) => existing.absorb(moved),
            _ => cohort.insert(to.language.clone(), LanguageRecord::touched(moved)),
        }
    }

    fn record(&mut self, change: &Resolved, at: Timestamp) {
        let cohort = self.ledger.cohort_mut(&change.basefile);
        match cohort.get_mut(&change.language) {
            Some(record) => match &mut record.activity {
                Activity::Touched(revisions) => revisions.record(&change.path, at, change.delta),
                Activity::Untouched => {
                    record.activity =
                        Activity::Touched(Revisions::new(change.path.clone(), at, change.delta))
                }
            },
            None => cohort.insert(
                change.language.clone(),
                LanguageRecord::touched(Revisions::new(change.path.clone(), at, change.delta)),
            ),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Latest event timestamp seen, or the seeded watermark.
    pub fn watermark(&self) -> Timestamp {
        self.watermark
    }

    /// Number of events applied in this run.
    pub fn replayed(&self) -> usize {
        self.replayed
    }

    pub fn finish(self) -> (Ledger, Timestamp) {
        (self.ledger, self.watermark)
    }
}

/// Replays `events` on top of `ledger`.
pub fn accumulate<I>(
    ledger: Ledger,
    events: I,
    classifier: &Classifier,
    targets: &TargetSet,
) -> Result<Ledger>
where
    I: IntoIterator<Item = CommitEvent>,
{
    let mut acc = Accumulator::resume(ledger, Timestamp::SENTINEL, classifier, targets);
    for event in events {
        acc.apply(&event)?;
    }
    Ok(acc.finish().0)
}
