// src/config.rs

use crate::cache::ReplaySettings;
use crate::error::{Error, Result};
use crate::locale::{Convention, LanguagePool};
use crate::renderer::{OutputFormat, ReportKind};
use crate::targets::{normalize_extension, normalize_root};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the history comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoSource {
    Local(PathBuf),
    Remote(String),
}

/// Run configuration, loadable from TOML with kebab-case keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    pub repo_path: Option<PathBuf>,
    pub repo_url: Option<String>,
    pub branch: String,
    pub content_paths: Vec<String>,
    pub extensions: Vec<String>,
    pub convention: Convention,
    /// Explicit language pool. When absent, every ISO 639-1 code is
    /// recognized and the expected languages are the observed ones.
    pub languages: Option<Vec<String>>,
    pub source_language: String,
    pub use_cache: bool,
    pub cache_dir: PathBuf,
    pub detail_source_language: Option<String>,
    pub detail_target_language: Option<String>,
    pub report: ReportKind,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repo_path: None,
            repo_url: None,
            branch: String::from("main"),
            content_paths: vec![String::from("content")],
            extensions: vec![String::from(".md")],
            convention: Convention::default(),
            languages: None,
            source_language: String::from("en"),
            use_cache: true,
            cache_dir: PathBuf::from(".git-lingo-cache"),
            detail_source_language: None,
            detail_target_language: None,
            report: ReportKind::default(),
            format: OutputFormat::default(),
            output: None,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!("cannot read config file {}: {e}", path.display()))
        })?;
        toml::from_str(&content).map_err(|e| {
            Error::configuration(format!("invalid config file {}: {e}", path.display()))
        })
    }

    /// Checks everything that can be checked before touching history.
    pub fn validate(&self) -> Result<()> {
        match (&self.repo_path, &self.repo_url) {
            (Some(_), Some(_)) => {
                return Err(Error::configuration(
                    "both a repository path and a repository URL were given",
                ))
            }
            (Some(path), None) if !path.is_dir() => {
                return Err(Error::configuration(format!(
                    "repository path {} is not a directory",
                    path.display()
                )))
            }
            (None, Some(url)) if url.trim().is_empty() => {
                return Err(Error::configuration("repository URL is empty"))
            }
            _ => {}
        }
        if self.branch.trim().is_empty() {
            return Err(Error::configuration("branch name is empty"));
        }
        if self.content_paths.is_empty() {
            return Err(Error::configuration("at least one content path is required"));
        }
        if self
            .content_paths
            .iter()
            .any(|p| normalize_root(p).is_empty())
        {
            return Err(Error::configuration("content paths contain an empty entry"));
        }
        if self.extensions.is_empty() {
            return Err(Error::configuration("at least one file extension is required"));
        }
        if self
            .extensions
            .iter()
            .any(|e| normalize_extension(e).is_empty())
        {
            return Err(Error::configuration("extensions contain an empty entry"));
        }
        if self.source_language.trim().is_empty() {
            return Err(Error::configuration("source language is empty"));
        }
        if let Some(languages) = &self.languages {
            if languages.is_empty() || languages.iter().any(|l| l.trim().is_empty()) {
                return Err(Error::configuration("language pool contains an empty code"));
            }
        }
        Ok(())
    }

    pub fn repo_source(&self) -> RepoSource {
        match (&self.repo_url, &self.repo_path) {
            (Some(url), _) => RepoSource::Remote(url.clone()),
            (None, Some(path)) => RepoSource::Local(path.clone()),
            (None, None) => RepoSource::Local(PathBuf::from(".")),
        }
    }

    pub fn language_pool(&self) -> LanguagePool {
        match &self.languages {
            Some(languages) => LanguagePool::explicit(languages.iter().map(|l| l.trim().to_string())),
            None => LanguagePool::iso639(),
        }
    }

    /// Content roots as `/`-separated repository-relative paths.
    pub fn content_roots(&self) -> Vec<String> {
        self.content_paths.iter().map(|p| normalize_root(p)).collect()
    }

    /// Settings a cached snapshot must share to be resumed.
    pub fn replay_settings(&self) -> ReplaySettings {
        ReplaySettings::new(
            &self.branch,
            self.convention,
            &self.content_paths,
            &self.extensions,
            self.languages.as_deref(),
        )
    }

    /// Cache key for this repository: the last path or URL component.
    pub fn repo_name(&self) -> String {
        let raw = match self.repo_source() {
            RepoSource::Remote(url) => url,
            RepoSource::Local(path) => path
                .canonicalize()
                .unwrap_or(path)
                .to_string_lossy()
                .into_owned(),
        };
        let name = raw
            .trim_end_matches(['/', '\\'])
            .rsplit(['/', '\\', ':'])
            .next()
            .unwrap_or_default()
            .trim_end_matches(".git");
        if name.is_empty() {
            String::from("repo")
        } else {
            name.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.branch, "main");
        assert_eq!(config.content_paths, vec!["content"]);
        assert_eq!(config.extensions, vec![".md"]);
        assert_eq!(config.convention, Convention::DirectorySegment);
        assert_eq!(config.source_language, "en");
        assert!(config.use_cache);
        assert_eq!(config.repo_source(), RepoSource::Local(PathBuf::from(".")));
        assert!(!config.language_pool().is_explicit());
    }

    #[test]
    fn parses_toml() {
        let config: Config = toml::from_str(
            r#"
            repo-url = "https://example.com/org/site.git"
            branch = "trunk"
            content-paths = ["content", "data"]
            extensions = ["md", "html"]
            convention = "suffix-tag"
            languages = ["en", "fr"]
            use-cache = false
            "#,
        )
        .unwrap();
        assert_eq!(config.branch, "trunk");
        assert_eq!(config.convention, Convention::SuffixTag);
        assert!(config.language_pool().contains("fr"));
        assert!(config.language_pool().is_explicit());
        assert_eq!(config.repo_name(), "site");
        assert!(!config.use_cache);
    }

    #[test]
    fn invalid_convention_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lingo.toml");
        std::fs::write(&path, "convention = \"by-country\"\n").unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn conflicting_sources_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            repo_path: Some(dir.path().to_path_buf()),
            repo_url: Some("https://example.com/site.git".into()),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn missing_repo_path_is_rejected() {
        let config = Config {
            repo_path: Some(PathBuf::from("/definitely/not/here")),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_lists_are_rejected() {
        let config = Config {
            extensions: vec![],
            ..Config::default()
        };
        assert!(config.validate().is_err());
        let config = Config {
            languages: Some(vec!["en".into(), " ".into()]),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn any_empty_entry_is_rejected() {
        for content_paths in [vec!["".to_string(), "content".to_string()], vec!["./".to_string()]] {
            let config = Config {
                content_paths,
                ..Config::default()
            };
            assert!(matches!(config.validate(), Err(Error::Configuration(_))));
        }
        let config = Config {
            extensions: vec![".md".into(), ".".into()],
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn replay_settings_follow_the_recording_options() {
        let base = Config::default();
        let widened = Config {
            content_paths: vec!["content".into(), "docs".into()],
            ..Config::default()
        };
        let respelled = Config {
            content_paths: vec!["./content/".into()],
            extensions: vec!["md".into()],
            ..Config::default()
        };
        let reported = Config {
            source_language: "fr".into(),
            detail_target_language: Some("de".into()),
            ..Config::default()
        };
        assert_ne!(base.replay_settings(), widened.replay_settings());
        assert_eq!(base.replay_settings(), respelled.replay_settings());
        assert_eq!(base.replay_settings(), reported.replay_settings());
    }
}
