#![warn(clippy::pedantic)]

//! # PHP latest (php-latest)
//!
//! Terminal host for the PHP toolchain updater. It keeps the newest published
//! PHP build in a local cache, registers its launcher under the name
//! `PHP latest` and tells the user when a new version was downloaded.
//!
//! ## Subcommands
//!
//! - `sync` - Check the release feed and refresh the cached toolchain (default)
//! - `status` - Show the cache, registry and feed settings
//! - `list` - List registered toolchains
//! - `version` - Display version information
//!
//! ## Examples
//!
//! Bring the cached toolchain up to date:
//! ```bash
//! php-latest
//! ```
//!
//! Compare the installed version with the latest release:
//! ```bash
//! php-latest status --remote
//! ```

mod commands;
mod host;
mod progress;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{list, status, sync, version};
use php_latest_updater::UpdateError;
use tracing_subscriber::EnvFilter;

/// Keeps the latest PHP interpreter installed and registered.
#[derive(Parser)]
#[command(
    name = "php-latest",
    author,
    version,
    about = "Keeps the latest PHP interpreter installed and registered",
    long_about = "The 'php-latest' command downloads the newest published PHP build for this \
    platform into a local cache and registers its launcher as the 'PHP latest' toolchain.",
    after_help = "\
ENVIRONMENT VARIABLES:
    PHP_LATEST_HOME         Home directory (default: <data dir>/php-latest)
    PHP_LATEST_FEED         Release API base URL (default: https://api.github.com)
    GITHUB_PAT              Optional credential for the release API
    RUST_LOG                Log filter, overrides -v"
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug).
    #[clap(short = 'v', long = "verbose", global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// The subcommand to execute. Defaults to `sync`.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands for the php-latest CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// Refresh the cached toolchain.
    ///
    /// Fetches the latest release, and when its tag differs from the cached
    /// toolchain, replaces the cache with the new build and registers it.
    Sync(sync::SyncArgs),

    /// Show the cache and registry state.
    Status(status::StatusArgs),

    /// List registered toolchains.
    List,

    /// Display version information.
    Version(version::VersionArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let exit_code = handle_error(&e);
        std::process::exit(exit_code);
    }
}

/// Handles an error and returns the appropriate exit code.
///
/// A cancelled sync exits with 130 like other interrupted commands. All other
/// errors are printed and exit with 1.
fn handle_error(e: &anyhow::Error) -> i32 {
    if let Some(UpdateError::Cancelled { .. }) = e.downcast_ref::<UpdateError>() {
        eprintln!("Interrupted.");
        return 130;
    }
    eprintln!("Error: {e:?}");
    1
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("php_latest=warn,php_latest_updater=warn"),
        1 => EnvFilter::new("php_latest=info,php_latest_updater=info"),
        _ => EnvFilter::new("php_latest=debug,php_latest_updater=debug"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Sync(args)) => sync::execute(&args).await,
        Some(Commands::Status(args)) => status::execute(&args).await,
        Some(Commands::List) => list::execute(),
        Some(Commands::Version(args)) => version::execute(&args),
        None => sync::execute(&sync::SyncArgs::default()).await,
    }
}
