//! Status command for the php-latest CLI.
//!
//! Shows what is cached and registered without changing anything.
//!
//! ## Usage
//!
//! ```bash
//! php-latest status            # Local state only
//! php-latest status --remote   # Also query the latest release
//! ```
//!
//! ## Output Format
//!
//! ```text
//! Platform:   linux
//! Home:       /home/me/.local/share/php-latest
//! Cache:      /home/me/.local/share/php-latest/cache
//! Installed:  7.1.9 (/home/me/.local/share/php-latest/cache/php-7.1.9/php.sh)
//! Registered: /home/me/.local/share/php-latest/cache/php-7.1.9/php.sh
//! Registry:   /home/me/.local/share/php-latest/toolchains.json
//! Feed:       https://api.github.com/repos/artspb/php-latest-linux/releases/latest
//! Latest:     7.2.0 (update available)
//! ```

use anyhow::{Context, Result};
use clap::Args;
use php_latest_updater::{CacheRoot, CacheState, Platform, ReleaseFetcher, ToolchainRegistry};

use super::Workspace;

/// Arguments for the status command.
#[derive(Args)]
pub struct StatusArgs {
    /// Query the release feed for the latest version.
    #[clap(long = "remote", action = clap::ArgAction::SetTrue)]
    pub remote: bool,
}

/// Executes the status command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, or with
/// `--remote` if the release feed cannot be queried.
pub async fn execute(args: &StatusArgs) -> Result<()> {
    let workspace = Workspace::load()?;
    let platform = Platform::detect();
    let cache = CacheRoot::new(workspace.cache_root(), workspace.config.layout.clone());
    let state = cache.inspect();
    let registry = workspace.registry();
    let registered = registry.find_by_name(&workspace.config.toolchain_name);
    let fetcher = ReleaseFetcher::new(workspace.config.feed.clone(), platform);

    println!("Platform:   {platform}");
    println!("Home:       {}", workspace.home.display());
    println!("Cache:      {}", cache.root().display());
    println!("Installed:  {}", describe(&state));
    match registered {
        Some(toolchain) => println!("Registered: {}", toolchain.executable.display()),
        None => println!("Registered: no"),
    }
    println!("Registry:   {}", registry.path().display());
    println!("Feed:       {}", fetcher.latest_release_url());

    if args.remote {
        if !platform.is_supported() {
            println!("Latest:     no builds for this platform");
            return Ok(());
        }
        let release = fetcher
            .fetch()
            .await
            .context("Failed to query the release feed")?;
        let verdict = if state.version() == Some(release.tag.as_str()) {
            "up to date"
        } else {
            "update available"
        };
        println!("Latest:     {} ({verdict})", release.tag);
    }

    Ok(())
}

fn describe(state: &CacheState) -> String {
    match state {
        CacheState::Empty => "none".to_string(),
        CacheState::Installed {
            version,
            executable,
        } => format!("{version} ({})", executable.display()),
        CacheState::Ambiguous { versions } => {
            format!("several toolchains ({}); next sync reinstalls", versions.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn describe_lists_every_state() {
        assert_eq!(describe(&CacheState::Empty), "none");
        assert_eq!(
            describe(&CacheState::Installed {
                version: "7.1.9".to_string(),
                executable: PathBuf::from("/c/php-7.1.9/php.sh"),
            }),
            "7.1.9 (/c/php-7.1.9/php.sh)"
        );
        assert!(
            describe(&CacheState::Ambiguous {
                versions: vec!["7.0.0".to_string(), "7.1.9".to_string()],
            })
            .contains("7.0.0, 7.1.9")
        );
    }
}
