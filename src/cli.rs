// src/cli.rs

use crate::config::Config;
use crate::error::Result;
use crate::locale::Convention;
use crate::renderer::{OutputFormat, ReportKind};
use clap::Parser;
use std::path::PathBuf;

/// Reports which translations of a content repository are open, out of date,
/// or complete, based on its git history.
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// TOML configuration file; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to a local git repository
    #[arg(short, long, env = "INPUT_REPO_PATH")]
    pub repo: Option<PathBuf>,

    /// URL of a remote repository to clone instead
    #[arg(long, env = "INPUT_REPO_URL")]
    pub repo_url: Option<String>,

    /// Branch to read history from
    #[arg(short, long, env = "INPUT_BRANCH")]
    pub branch: Option<String>,

    /// Directories holding translatable content
    #[arg(long = "content-path", env = "INPUT_CONTENT_PATHS", value_delimiter = ' ', num_args = 1..)]
    pub content_paths: Vec<String>,

    /// Extensions of monitored files
    #[arg(long = "extension", env = "INPUT_EXTENSIONS", value_delimiter = ' ', num_args = 1..)]
    pub extensions: Vec<String>,

    /// How file paths encode their language
    #[arg(long, value_enum, env = "INPUT_PATTERN")]
    pub convention: Option<Convention>,

    /// Languages to monitor; auto-detected when omitted
    #[arg(long = "langs", env = "INPUT_LANGS", value_delimiter = ' ', num_args = 1..)]
    pub languages: Vec<String>,

    /// Language preferred as source when first commits tie
    #[arg(long, env = "INPUT_SRC_LANG")]
    pub source_lang: Option<String>,

    /// Replay the full history instead of resuming from the cache
    #[arg(long)]
    pub no_cache: bool,

    /// Directory for history snapshots
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Only show detail rows with this source language
    #[arg(long, env = "INPUT_DETAIL_SRC_LANG")]
    pub detail_src_lang: Option<String>,

    /// Only show detail rows with this target language
    #[arg(long, env = "INPUT_DETAIL_TGT_LANG")]
    pub detail_tgt_lang: Option<String>,

    /// Which report to produce
    #[arg(long, value_enum)]
    pub report: Option<ReportKind>,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(clap::ValueEnum, Clone, Debug, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Args {
    /// Layers the flags over the config file (or the defaults).
    pub fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(repo) = self.repo {
            config.repo_path = Some(repo);
        }
        if let Some(url) = non_empty(self.repo_url) {
            config.repo_url = Some(url);
        }
        if let Some(branch) = non_empty(self.branch) {
            config.branch = branch;
        }
        let content_paths: Vec<String> = self.content_paths.into_iter().filter(|p| !p.is_empty()).collect();
        if !content_paths.is_empty() {
            config.content_paths = content_paths;
        }
        let extensions: Vec<String> = self.extensions.into_iter().filter(|e| !e.is_empty()).collect();
        if !extensions.is_empty() {
            config.extensions = extensions;
        }
        if let Some(convention) = self.convention {
            config.convention = convention;
        }
        let languages: Vec<String> = self.languages.into_iter().filter(|l| !l.is_empty()).collect();
        if !languages.is_empty() {
            config.languages = Some(languages);
        }
        if let Some(lang) = non_empty(self.source_lang) {
            config.source_language = lang;
        }
        if self.no_cache {
            config.use_cache = false;
        }
        if let Some(dir) = self.cache_dir {
            config.cache_dir = dir;
        }
        if let Some(lang) = non_empty(self.detail_src_lang) {
            config.detail_source_language = Some(lang);
        }
        if let Some(lang) = non_empty(self.detail_tgt_lang) {
            config.detail_target_language = Some(lang);
        }
        if let Some(report) = self.report {
            config.report = report;
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if let Some(output) = self.output {
            config.output = Some(output);
        }

        config.validate()?;
        Ok(config)
    }
}
