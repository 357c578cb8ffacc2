//! Sync command for the php-latest CLI.
//!
//! Runs one update cycle: fetch the latest release, compare its tag with the
//! cached toolchain, and replace the cache when they differ.
//!
//! ## Usage
//!
//! ```bash
//! php-latest sync           # With a progress line
//! php-latest sync --quiet   # Without progress output
//! ```
//!
//! An unreachable release feed is not an error: the cached toolchain stays
//! as it is and the command exits successfully. Ctrl-C aborts an in-flight
//! download and leaves no partial toolchain behind.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use php_latest_updater::{
    CycleOutcome, HostServices, LivenessFlag, Platform, SkipReason, UpdateOrchestrator,
};
use tokio_util::sync::CancellationToken;

use super::Workspace;
use crate::host::TerminalNotifier;
use crate::progress::terminal_progress;

/// Arguments for the sync command.
#[derive(Args, Default)]
pub struct SyncArgs {
    /// Do not print download progress.
    #[clap(short = 'q', long = "quiet", action = clap::ArgAction::SetTrue)]
    pub quiet: bool,
}

/// Executes the sync command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or the update
/// cycle fails for any reason other than an unreachable feed.
pub async fn execute(args: &SyncArgs) -> Result<()> {
    let workspace = Workspace::load()?;
    let platform = Platform::detect();

    let host = HostServices {
        context: Arc::new(LivenessFlag::new()),
        registry: Arc::new(workspace.registry()),
        notifier: Arc::new(TerminalNotifier),
    };

    let cancel = CancellationToken::new();
    let mut orchestrator =
        UpdateOrchestrator::new(&workspace.config, workspace.cache_root(), platform, host)
            .with_cancellation(cancel.clone());
    if !args.quiet {
        orchestrator = orchestrator.with_progress(terminal_progress());
    }

    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, cancelling");
                cancel.cancel();
            }
        }
    });

    let result = orchestrator.run_cycle().await;
    interrupt.abort();

    report(&result?, platform);
    Ok(())
}

fn report(outcome: &CycleOutcome, platform: Platform) {
    match outcome {
        CycleOutcome::Skipped(SkipReason::UnsupportedPlatform) => {
            println!("No PHP builds are published for this platform ({platform}).");
        }
        CycleOutcome::Skipped(SkipReason::DefaultContext) => {
            println!("Nothing to do.");
        }
        CycleOutcome::Offline => {
            println!("Release feed is unreachable; keeping the cached toolchain.");
        }
        CycleOutcome::UpToDate {
            version,
            executable,
        } => {
            println!("PHP {version} is up to date ({}).", executable.display());
        }
        CycleOutcome::Installed {
            version,
            executable,
        } => {
            println!("PHP {version} installed at {}.", executable.display());
        }
        CycleOutcome::Abandoned { version } => {
            println!("PHP {version} is installed but was not registered.");
        }
        CycleOutcome::Busy => {
            println!("An update is already in progress.");
        }
    }
}
