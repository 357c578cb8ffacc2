//! Terminal implementations of the updater's host traits.
//!
//! ## Registry File
//!
//! Registered toolchains are kept in `<home>/toolchains.json`:
//!
//! ```json
//! [
//!   { "name": "PHP latest", "executable": "/home/me/.local/share/php-latest/cache/php-7.1.9/php.sh" }
//! ]
//! ```
//!
//! The file is rewritten through a temporary sibling and a rename, so a
//! reader sees either the old or the new list.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use php_latest_updater::{
    Notification, Notifier, Toolchain, ToolchainRegistry, UpdateError, UpdateResult,
};

/// Registry file name inside the home directory.
pub const REGISTRY_FILE: &str = "toolchains.json";

/// Toolchain registry persisted as a JSON array.
#[derive(Debug)]
pub struct FileRegistry {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileRegistry {
    /// Creates a registry backed by `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Creates the registry stored in `home`.
    #[must_use]
    pub fn in_home(home: &Path) -> Self {
        Self::new(home.join(REGISTRY_FILE))
    }

    /// Returns the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the list. A missing file is an empty registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is unreadable or not valid JSON.
    pub fn load(&self) -> UpdateResult<Vec<Toolchain>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(UpdateError::io("Failed to read registry", &self.path, e)),
        };
        serde_json::from_str(&text).map_err(|e| {
            UpdateError::registration(format!("{} is not a valid registry: {e}", self.path.display()))
        })
    }

    /// Reads the list, treating an unreadable file as empty.
    fn load_or_empty(&self) -> Vec<Toolchain> {
        self.load().unwrap_or_else(|e| {
            tracing::warn!("{e}");
            Vec::new()
        })
    }

    fn store(&self, toolchains: &[Toolchain]) -> UpdateResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| UpdateError::io("Failed to create directory", parent, e))?;
        }
        let json = serde_json::to_string_pretty(toolchains)
            .map_err(|e| UpdateError::registration(format!("Failed to serialize registry: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| UpdateError::io("Failed to write registry", &tmp, e))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| UpdateError::io("Failed to replace registry", &self.path, e))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl ToolchainRegistry for FileRegistry {
    fn find_by_name(&self, name: &str) -> Option<Toolchain> {
        self.load_or_empty().into_iter().find(|t| t.name == name)
    }

    fn add(&self, toolchain: Toolchain) -> UpdateResult<()> {
        let _guard = self.lock();
        let mut toolchains = self.load()?;
        toolchains.push(toolchain);
        self.store(&toolchains)
    }

    fn list(&self) -> Vec<Toolchain> {
        self.load_or_empty()
    }

    fn replace(&self, toolchains: Vec<Toolchain>) -> UpdateResult<()> {
        let _guard = self.lock();
        self.store(&toolchains)
    }
}

/// Prints notifications to stdout.
#[derive(Debug, Default)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: Notification) {
        println!();
        println!("{}: {}", notification.title, notification.message());
        println!(
            "  {}: point your tools at {}",
            notification.action.label(),
            notification.executable.display()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;
    use php_latest_updater::{Registration, register};

    #[test]
    fn missing_file_is_empty_registry() {
        let temp = TempDir::new().expect("Should create temp dir");
        let registry = FileRegistry::in_home(temp.path());

        assert!(registry.list().is_empty());
        assert!(registry.find_by_name("PHP latest").is_none());
    }

    #[test]
    fn add_persists_entry() {
        let temp = TempDir::new().expect("Should create temp dir");
        let registry = FileRegistry::in_home(temp.path());

        registry
            .add(Toolchain::new("PHP latest", "/c/php-7.1.9/php.sh"))
            .expect("Should add");

        let reopened = FileRegistry::in_home(temp.path());
        assert_eq!(
            reopened.find_by_name("PHP latest"),
            Some(Toolchain::new("PHP latest", "/c/php-7.1.9/php.sh"))
        );
        temp.child(REGISTRY_FILE)
            .assert(predicates::str::contains("php-7.1.9"));
        temp.child("toolchains.json.tmp")
            .assert(predicates::path::missing());
    }

    #[test]
    fn register_updates_existing_entry_in_file() {
        let temp = TempDir::new().expect("Should create temp dir");
        let registry = FileRegistry::in_home(temp.path());
        registry
            .replace(vec![
                Toolchain::new("system", "/usr/bin/php"),
                Toolchain::new("PHP latest", "/c/php-7.1.9/php.sh"),
            ])
            .expect("Should replace");

        let result = register(&registry, "PHP latest", Path::new("/c/php-7.2.0/php.sh"))
            .expect("Should register");

        assert_eq!(result, Registration::Updated);
        assert_eq!(
            registry.list(),
            vec![
                Toolchain::new("system", "/usr/bin/php"),
                Toolchain::new("PHP latest", "/c/php-7.2.0/php.sh"),
            ]
        );
    }

    #[test]
    fn corrupt_file_is_reported_on_load() {
        let temp = TempDir::new().expect("Should create temp dir");
        temp.child(REGISTRY_FILE)
            .write_str("not json")
            .expect("Should write");
        let registry = FileRegistry::in_home(temp.path());

        assert!(matches!(
            registry.load(),
            Err(UpdateError::Registration { .. })
        ));
        assert!(registry.list().is_empty());
        assert!(registry.add(Toolchain::new("x", "/x")).is_err());
    }
}
