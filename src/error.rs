// src/error.rs

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A monitored path could not be mapped to (basefile, language).
    #[error("cannot classify {path}: {reason}")]
    Classification { path: String, reason: String },

    /// A rename annotation in a change record is ambiguous.
    #[error("cannot parse rename in {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    /// Unreadable snapshot. Recovered inside the cache, never fatal.
    #[error("cache snapshot {path} is unusable: {reason}")]
    CacheCorruption { path: String, reason: String },

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn classification(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Classification {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn parse(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Whether the run must abort on this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::CacheCorruption { .. })
    }
}
