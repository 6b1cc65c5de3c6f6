//! firmsync - firmware release synchronizer
//!
//! Retrieves a firmware release manifest, then downloads, verifies and
//! installs every release the configured filters want and the cache does
//! not already hold.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod config;
mod error;
mod fetch;
mod http;
mod output;
mod source;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use firmsync_engine::{RunReport, Synchronizer};
use firmsync_signal::Signal;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Overrides;
use crate::error::CliError;
use crate::fetch::ManifestFetcher;
use crate::http::HttpArchiveSource;
use crate::source::TransportSource;

/// Crates whose logs `-v` controls.
const LOG_TARGETS: [&str; 5] = [
    "firmsync",
    "firmsync_engine",
    "firmsync_archive",
    "firmsync_manifest",
    "firmsync_signal",
];

#[derive(Parser, Debug)]
#[command(name = "firmsync")]
#[command(about = "Download and install firmware releases listed in a manifest")]
#[command(version)]
#[command(long_about = "
firmsync keeps a firmware directory in sync with a published release manifest.
Each release is filtered by model and file patterns, checked against the local
cache, and downloaded only when something is missing or out of date. Files are
verified against the manifest checksum before they are installed.

Settings come from the configuration file, then environment variables, then
command-line flags.
")]
struct Cli {
    /// JSON configuration file
    #[arg(long, env = "FIRMSYNC_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    /// Verbose logging
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let directives = LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",");

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| directives.into()))
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(io::stderr)
                .with_ansi(io::stderr().is_terminal()),
        )
        .init();
}

#[cfg(unix)]
async fn interrupted() -> io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn interrupted() -> io::Result<()> {
    tokio::signal::ctrl_c().await
}

fn run(cli: &Cli) -> Result<RunReport> {
    info!("Starting firmware synchronizer...");
    let config = config::resolve(cli.config.as_deref(), &cli.overrides)?;
    config.log_effective();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("firmsync-io")
        .build()
        .context("Failed to start the async runtime")?;
    let client = fetch::http_client().context("Failed to build the HTTP client")?;

    let location = fetch::manifest_location(&config.manifest).map_err(CliError::ManifestLocation)?;
    info!("Retrieving firmware manifest from {location}");
    let fetcher = ManifestFetcher::new(client.clone());
    let manifest = runtime
        .block_on(
            config
                .retry_policy()
                .run("retrieve the firmware manifest", || fetcher.fetch(&location)),
        )
        .map_err(CliError::ManifestUnavailable)?;
    info!("Manifest retrieved and parsed successfully.");
    for line in manifest.summary() {
        info!("{line}");
    }

    // Until here an interrupt ends the process; nothing has been written.
    let shutdown = Signal::new();
    let root = shutdown.clone();
    runtime.spawn(async move {
        match interrupted().await {
            Ok(()) => {
                warn!("Interrupt received, stopping after cleanup");
                root.trigger();
            }
            Err(err) => warn!("Unable to listen for shutdown signals: {err}"),
        }
    });

    let source = TransportSource::new(HttpArchiveSource::new(client, runtime.handle().clone()));
    let mut sync = Synchronizer::new(config.sync_config(), source);
    let report = sync.run(&shutdown, &manifest);
    info!("{report}");
    Ok(report)
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            if err.print().is_err() {
                eprintln!("{err}");
            }
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_tracing(cli.verbose);
    if !io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    match run(&cli) {
        Ok(report) => {
            output::print_report(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            output::print_error_human(&e);
            ExitCode::from(error::exit_code(&e))
        }
    }
}
