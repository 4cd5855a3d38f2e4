// src/monitor.rs

use crate::accumulator::Accumulator;
use crate::analyzer::GitHistory;
use crate::cache::SnapshotCache;
use crate::config::{Config, RepoSource};
use crate::error::{Error, Result};
use crate::locale::Classifier;
use crate::model::{Ledger, Timestamp};
use crate::renderer::{render, write_output};
use crate::report::{stats, DetailRow, LanguageStats, Reporter};
use crate::source::resolve_sources;
use crate::status::{classify_statuses, ensure_languages};
use crate::targets::discover;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Everything one run produces.
#[derive(Debug)]
pub struct Outcome {
    /// Annotated ledger: every record carries a status.
    pub ledger: Ledger,
    pub watermark: Timestamp,
    /// Events applied in this run, after any cached watermark.
    pub replayed: usize,
    pub stats: BTreeMap<String, LanguageStats>,
    pub details: Vec<DetailRow>,
    pub rendered: String,
}

/// Open or cloned repository. A clone lives as long as this value.
struct Checkout {
    history: GitHistory,
    root: PathBuf,
    _clone_dir: Option<TempDir>,
}

fn open_repository(config: &Config) -> Result<Checkout> {
    let (history, clone_dir) = match config.repo_source() {
        RepoSource::Local(path) => (
            GitHistory::open(&path, &config.branch, &config.content_roots())?,
            None,
        ),
        RepoSource::Remote(url) => {
            let dir = tempfile::Builder::new().prefix("git-lingo-").tempdir()?;
            let history = GitHistory::clone_remote(&url, &config.branch, dir.path(), &config.content_roots())?;
            (history, Some(dir))
        }
    };

    let root = history
        .workdir()
        .map(Path::to_path_buf)
        .ok_or_else(|| Error::configuration("bare repositories have no working tree to scan"))?;

    match history.head_branch() {
        Some(head) if head == config.branch => {}
        head => tracing::warn!(
            branch = %config.branch,
            head = head.as_deref().unwrap_or("(detached)"),
            "working tree is not on the monitored branch; file list and word counts come from the working tree"
        ),
    }

    Ok(Checkout {
        history,
        root,
        _clone_dir: clone_dir,
    })
}

fn spinner() -> ProgressBar {
    let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}: {pos} commits [{elapsed}]") {
        bar.set_style(style);
    }
    bar.set_message("Replaying history");
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

/// Runs the pipeline and renders the report, without writing it.
pub fn analyze(config: &Config) -> Result<Outcome> {
    config.validate()?;
    let checkout = open_repository(config)?;

    let targets = discover(&checkout.root, &config.content_paths, &config.extensions)?;
    tracing::info!(count = targets.len(), root = %checkout.root.display(), "discovered target files");

    let pool = config.language_pool();
    let classifier = Classifier::new(config.convention, pool.clone());

    let mut cache = config.use_cache.then(|| {
        SnapshotCache::new(&config.cache_dir, &config.repo_name(), config.replay_settings())
    });
    let (ledger, watermark) = match cache.as_mut() {
        Some(cache) => cache.load()?,
        None => (Ledger::new(), Timestamp::SENTINEL),
    };

    let started = Instant::now();
    let bar = spinner();
    let mut acc = Accumulator::resume(ledger, watermark, &classifier, &targets);
    for event in checkout.history.events(watermark)? {
        let event = event?;
        if let Err(err) = acc.apply(&event) {
            bar.abandon_with_message("Replay failed");
            return Err(err);
        }
        bar.inc(1);
    }
    let replayed = acc.replayed();
    bar.finish_with_message("Replay done");
    let (mut ledger, watermark) = acc.finish();
    tracing::info!(
        replayed,
        basefiles = ledger.len(),
        elapsed = ?started.elapsed(),
        "history replayed"
    );

    if let Some(cache) = cache.as_mut() {
        match cache.save(&ledger, watermark) {
            Ok(path) => tracing::debug!(path = %path.display(), "snapshot stored"),
            Err(err) => tracing::warn!(error = %err, "could not store snapshot"),
        }
    }

    let expected: BTreeSet<String> = if pool.is_explicit() {
        pool.codes().clone()
    } else {
        ledger.languages()
    };
    ensure_languages(&mut ledger, &expected);
    let sources = resolve_sources(&ledger, &config.source_language);
    classify_statuses(&mut ledger, &sources);

    let stats = stats(&ledger);
    let details = Reporter::new(&checkout.root)
        .with_filters(
            config.detail_source_language.clone(),
            config.detail_target_language.clone(),
        )
        .details(&ledger);
    let rendered = render(config.report, config.format, &stats, &details)?;

    Ok(Outcome {
        ledger,
        watermark,
        replayed,
        stats,
        details,
        rendered,
    })
}

/// Runs the pipeline and writes the report to its destination.
pub fn run(config: &Config) -> Result<Outcome> {
    let outcome = analyze(config)?;
    write_output(config.output.as_deref(), &outcome.rendered)?;
    Ok(outcome)
}
