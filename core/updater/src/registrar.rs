//! Registration of the installed toolchain with the host.
//!
//! The host keeps a list of named toolchains. The updater owns exactly one
//! entry in it, identified by name, and keeps its path pointing at the
//! current launcher.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::UpdateResult;

/// A named toolchain known to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toolchain {
    /// Display name, unique within the registry.
    pub name: String,
    /// Path of the launcher.
    pub executable: PathBuf,
}

impl Toolchain {
    /// Creates a new toolchain entry.
    #[must_use]
    pub fn new(name: impl Into<String>, executable: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            executable: executable.into(),
        }
    }
}

/// Host-managed list of named toolchains.
///
/// Implementations only need to make each call atomic on its own;
/// concurrent external edits during a refresh are not supported.
pub trait ToolchainRegistry: Send + Sync {
    /// Returns the entry named `name`, if any.
    fn find_by_name(&self, name: &str) -> Option<Toolchain>;

    /// Appends an entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be updated.
    fn add(&self, toolchain: Toolchain) -> UpdateResult<()>;

    /// Returns every entry.
    fn list(&self) -> Vec<Toolchain>;

    /// Replaces the whole list in one step.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be updated.
    fn replace(&self, toolchains: Vec<Toolchain>) -> UpdateResult<()>;
}

/// What [`register`] changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// A new entry was added.
    Added,
    /// The existing entry now points at a new path.
    Updated,
    /// The entry already pointed at this path.
    Unchanged,
}

/// Makes the registry entry `name` point at `executable`.
///
/// Adds the entry when it is missing. When it exists with another path, the
/// list is read, the entry swapped in place and the list written back with a
/// single [`ToolchainRegistry::replace`]. Calling it again with the same
/// arguments is a no-op.
///
/// # Errors
///
/// Returns an error if the registry rejects the update.
pub fn register(
    registry: &dyn ToolchainRegistry,
    name: &str,
    executable: &Path,
) -> UpdateResult<Registration> {
    match registry.find_by_name(name) {
        None => {
            registry.add(Toolchain::new(name, executable))?;
            tracing::info!("Registered {name} at {}", executable.display());
            Ok(Registration::Added)
        }
        Some(existing) if existing.executable == executable => Ok(Registration::Unchanged),
        Some(_) => {
            let toolchains = registry
                .list()
                .into_iter()
                .map(|t| {
                    if t.name == name {
                        Toolchain::new(name, executable)
                    } else {
                        t
                    }
                })
                .collect();
            registry.replace(toolchains)?;
            tracing::info!("Updated {name} to {}", executable.display());
            Ok(Registration::Updated)
        }
    }
}

/// A registry held in memory.
///
/// Used by hosts that persist the list themselves and by tests.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    toolchains: std::sync::Mutex<Vec<Toolchain>>,
}

impl MemoryRegistry {
    /// Creates a registry pre-filled with `toolchains`.
    #[must_use]
    pub fn with_toolchains(toolchains: Vec<Toolchain>) -> Self {
        Self {
            toolchains: std::sync::Mutex::new(toolchains),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Toolchain>> {
        self.toolchains
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl ToolchainRegistry for MemoryRegistry {
    fn find_by_name(&self, name: &str) -> Option<Toolchain> {
        self.lock().iter().find(|t| t.name == name).cloned()
    }

    fn add(&self, toolchain: Toolchain) -> UpdateResult<()> {
        self.lock().push(toolchain);
        Ok(())
    }

    fn list(&self) -> Vec<Toolchain> {
        self.lock().clone()
    }

    fn replace(&self, toolchains: Vec<Toolchain>) -> UpdateResult<()> {
        *self.lock() = toolchains;
        Ok(())
    }
}
