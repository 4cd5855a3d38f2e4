// src/lib.rs

//! Translation completeness monitor for multi-language content repositories.
//!
//! Replays the git history of the monitored files, groups the language
//! variants of each document, picks the source language per document and
//! reports which translations are open, out of date, or complete.

pub mod accumulator;
pub mod analyzer;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod locale;
pub mod model;
pub mod monitor;
pub mod rename;
pub mod renderer;
pub mod report;
pub mod source;
pub mod status;
pub mod targets;

pub use config::Config;
pub use error::{Error, Result};
pub use model::{CommitEvent, FileChange, Ledger, Status, Timestamp};
pub use monitor::{analyze, run, Outcome};
