// src/main.rs

use anyhow::{Context, Result};
use clap::Parser;
use git_lingo::cli::{Args, LogFormat};
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn setup_tracing(format: LogFormat, verbose: bool) {
    let default = if verbose { "git_lingo=debug,warn" } else { "git_lingo=info,warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn try_main(args: Args) -> Result<()> {
    let start_time = Instant::now();
    let config = args.into_config().context("invalid configuration")?;
    let outcome = git_lingo::run(&config).context("translation report failed")?;
    tracing::info!(
        basefiles = outcome.ledger.len(),
        rows = outcome.details.len(),
        elapsed = ?start_time.elapsed(),
        "done"
    );
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    setup_tracing(args.log_format, args.verbose);

    match try_main(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
