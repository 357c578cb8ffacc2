//! Command modules for the php-latest CLI.
//!
//! - [`sync`] - Refresh the cached toolchain
//! - [`status`] - Show cache, registry and feed state
//! - [`list`] - List registered toolchains
//! - [`version`] - Display version information

pub mod list;
pub mod status;
pub mod sync;
pub mod version;

use std::path::PathBuf;

use anyhow::{Context, Result};
use php_latest_updater::{UpdaterConfig, default_home};

use crate::host::FileRegistry;

/// Resolved home directory and the configuration stored in it.
pub struct Workspace {
    /// Home directory.
    pub home: PathBuf,
    /// Loaded configuration, defaults where the file is silent.
    pub config: UpdaterConfig,
}

impl Workspace {
    /// Resolves the home directory and loads `config.toml` from it.
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined or the
    /// configuration file is invalid.
    pub fn load() -> Result<Self> {
        let home = default_home()
            .context("Cannot determine home directory. Set PHP_LATEST_HOME.")?;
        let config = UpdaterConfig::load(&home)
            .with_context(|| format!("Failed to load configuration from {}", home.display()))?;
        Ok(Self { home, config })
    }

    /// Returns the cache root.
    #[must_use]
    pub fn cache_root(&self) -> PathBuf {
        self.config.cache_root(&self.home)
    }

    /// Returns the registry persisted in the home directory.
    #[must_use]
    pub fn registry(&self) -> FileRegistry {
        FileRegistry::in_home(&self.home)
    }
}
