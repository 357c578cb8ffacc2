//! List command for the php-latest CLI.
//!
//! Displays the registered toolchains and marks the one this tool manages.
//!
//! ## Output Format
//!
//! ```text
//! Registered toolchains:
//!   system        /usr/bin/php
//! * PHP latest    /home/me/.local/share/php-latest/cache/php-7.1.9/php.sh
//! ```

use anyhow::Result;

use super::Workspace;

/// Executes the list command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or the registry
/// file is corrupt.
pub fn execute() -> Result<()> {
    let workspace = Workspace::load()?;
    let registry = workspace.registry();
    let toolchains = registry.load()?;

    if toolchains.is_empty() {
        println!("No toolchains registered.");
        println!();
        println!("Run 'php-latest sync' to install the latest PHP interpreter.");
        return Ok(());
    }

    let width = toolchains.iter().map(|t| t.name.len()).max().unwrap_or(0);
    println!("Registered toolchains:");
    for toolchain in &toolchains {
        let marker = if toolchain.name == workspace.config.toolchain_name {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} {:<width$}    {}",
            toolchain.name,
            toolchain.executable.display()
        );
    }

    if let Some(missing) = toolchains
        .iter()
        .find(|t| t.name == workspace.config.toolchain_name && !t.executable.is_file())
    {
        println!();
        println!(
            "'{}' points at a missing launcher ({}). Run 'php-latest sync'.",
            missing.name,
            missing.executable.display()
        );
    }

    Ok(())
}
