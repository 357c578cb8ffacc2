//! Cache root layout and inspection.
//!
//! The cache root holds at most one installed toolchain:
//!
//! ```text
//! <cache root>/
//!   php-<tag>/            # Versioned toolchain directory
//!     php.sh              # Launcher, used as the installation marker
//!     php.tar.gz          # Present only while an install is in progress
//!     ...
//! ```
//!
//! A directory counts as an installation only if it follows the naming
//! convention and contains the launcher. The root is wiped and recreated on
//! every version change.

use std::path::{Path, PathBuf};

use crate::config::ToolchainLayout;
use crate::errors::{UpdateError, UpdateResult};

/// What the cache root currently holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheState {
    /// No installation.
    Empty,
    /// Exactly one installation.
    Installed {
        /// Version suffix of the toolchain directory.
        version: String,
        /// Launcher inside that directory.
        executable: PathBuf,
    },
    /// More than one installation. Treated as a corrupt cache.
    Ambiguous {
        /// Every version found, sorted.
        versions: Vec<String>,
    },
}

impl CacheState {
    /// Returns the installed version if exactly one is present.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        match self {
            Self::Installed { version, .. } => Some(version),
            Self::Empty | Self::Ambiguous { .. } => None,
        }
    }
}

/// Paths inside the cache root.
#[derive(Debug, Clone)]
pub struct CacheRoot {
    root: PathBuf,
    layout: ToolchainLayout,
}

impl CacheRoot {
    /// Creates a new `CacheRoot` over `root`.
    #[must_use]
    pub fn new(root: PathBuf, layout: ToolchainLayout) -> Self {
        Self { root, layout }
    }

    /// Returns the cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the directory for a given version.
    #[must_use = "returns the path without side effects"]
    pub fn toolchain_dir(&self, version: &str) -> PathBuf {
        self.root.join(format!("{}{version}", self.layout.dir_prefix))
    }

    /// Returns the launcher inside a toolchain directory.
    #[must_use = "returns the path without side effects"]
    pub fn executable(&self, toolchain_dir: &Path) -> PathBuf {
        toolchain_dir.join(&self.layout.launcher)
    }

    /// Returns the temporary archive path inside a toolchain directory.
    #[must_use = "returns the path without side effects"]
    pub fn archive_path(&self, toolchain_dir: &Path) -> PathBuf {
        toolchain_dir.join(&self.layout.archive_name)
    }

    /// Returns the version suffix of `name` if it follows the naming convention.
    fn version_of<'a>(&self, name: &'a str) -> Option<&'a str> {
        name.strip_prefix(&self.layout.dir_prefix)
            .filter(|v| !v.is_empty())
    }

    /// Lists every installed version, in directory iteration order.
    fn installed_versions(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return Vec::new();
        };

        entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name();
                let version = self.version_of(name.to_str()?)?.to_string();
                let dir = entry.path();
                (dir.is_dir() && self.executable(&dir).is_file()).then_some(version)
            })
            .collect()
    }

    /// Returns the installed version, or an empty string if there is none.
    ///
    /// When several installations exist the first one found wins; iteration
    /// order is filesystem-defined.
    #[must_use]
    pub fn current_version(&self) -> String {
        self.installed_versions()
            .into_iter()
            .next()
            .unwrap_or_default()
    }

    /// Inspects the cache root without modifying it.
    #[must_use]
    pub fn inspect(&self) -> CacheState {
        let mut versions = self.installed_versions();
        match versions.len() {
            0 => CacheState::Empty,
            1 => {
                let version = versions.remove(0);
                let executable = self.executable(&self.toolchain_dir(&version));
                CacheState::Installed {
                    version,
                    executable,
                }
            }
            _ => {
                versions.sort();
                CacheState::Ambiguous { versions }
            }
        }
    }

    /// Deletes the cache root and everything in it, if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be removed.
    pub fn clear(&self) -> UpdateResult<()> {
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => {
                tracing::debug!("Removed cache root {}", self.root.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(UpdateError::io(
                "Failed to delete cache root",
                &self.root,
                e,
            )),
        }
    }

    /// Creates the directory for `version`, including the cache root.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created.
    pub fn create_toolchain_dir(&self, version: &str) -> UpdateResult<PathBuf> {
        let dir = self.toolchain_dir(version);
        std::fs::create_dir_all(&dir)
            .map_err(|e| UpdateError::io("Unable to create directories", &dir, e))?;
        Ok(dir)
    }
}
