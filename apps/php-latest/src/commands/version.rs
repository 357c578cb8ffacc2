//! Version command for the php-latest CLI.

use anyhow::Result;
use clap::Args;
use php_latest_updater::Platform;

/// Arguments for the version command.
#[derive(Args)]
pub struct VersionArgs {
    /// Show the platform and release feed selector as well.
    #[clap(long = "detailed", action = clap::ArgAction::SetTrue)]
    pub detailed: bool,
}

/// Executes the version command.
#[allow(clippy::unnecessary_wraps)]
pub fn execute(args: &VersionArgs) -> Result<()> {
    println!("php-latest {}", env!("CARGO_PKG_VERSION"));
    if args.detailed {
        let platform = Platform::detect();
        println!();
        println!("Build Information:");
        println!("  Platform: {}", platform_string());
        println!("  Feed:     {}", platform.feed_selector());
        println!("  Updates:  {}", if platform.is_supported() { "yes" } else { "no" });
    }
    Ok(())
}

/// Returns a human-readable platform string.
fn platform_string() -> String {
    format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)
}
