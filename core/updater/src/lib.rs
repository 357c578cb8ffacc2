#![warn(clippy::pedantic)]
//! Keeps a locally cached PHP toolchain in sync with its latest release.
//!
//! The crate checks a release feed, compares the published tag with the
//! toolchain in the cache root, and when they differ replaces the cached
//! toolchain: wipe the cache root, download the archive, extract it, rewrite
//! the `$(pwd)` placeholders, then register the launcher with the host.
//!
//! ## Module Structure
//!
//! - [`platform`] - OS family selection for the release feed
//! - [`config`] - Feed, layout and cache settings
//! - [`release`] - Release metadata fetching and validation
//! - [`download`] - Streaming HTTP download with progress and cancellation
//! - [`archive`] - tar.gz extraction
//! - [`template`] - Install-path substitution
//! - [`cache`] - Cache root layout and inspection
//! - [`installer`] - Download-and-install of one release
//! - [`registrar`] - Host toolchain registry updates
//! - [`host`] - Host adapter traits
//! - [`orchestrator`] - The update cycle
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use php_latest_updater::{
//!     HostServices, LivenessFlag, MemoryRegistry, Notification, Notifier, Platform,
//!     UpdateOrchestrator, UpdaterConfig,
//! };
//!
//! struct Print;
//! impl Notifier for Print {
//!     fn notify(&self, n: Notification) {
//!         println!("{}", n.message());
//!     }
//! }
//!
//! # async fn run() -> Result<(), php_latest_updater::UpdateError> {
//! let config = UpdaterConfig::default();
//! let host = HostServices {
//!     context: Arc::new(LivenessFlag::new()),
//!     registry: Arc::new(MemoryRegistry::default()),
//!     notifier: Arc::new(Print),
//! };
//! let orchestrator =
//!     UpdateOrchestrator::new(&config, "/tmp/php-cache".into(), Platform::detect(), host);
//! let outcome = orchestrator.run_cycle().await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod cache;
pub mod config;
pub mod download;
pub mod errors;
pub mod host;
pub mod installer;
pub mod orchestrator;
pub mod platform;
pub mod registrar;
pub mod release;
pub mod template;

pub use cache::{CacheRoot, CacheState};
pub use config::{FeedConfig, ToolchainLayout, UpdaterConfig, default_home};
pub use download::{ProgressCallback, ProgressEvent, silent_progress};
pub use errors::{UpdateError, UpdateResult};
pub use host::{
    HostContext, HostServices, LivenessFlag, Notification, NotificationAction, Notifier,
};
pub use installer::ArchiveInstaller;
pub use orchestrator::{CycleOutcome, SkipReason, UpdateOrchestrator, UpdateState};
pub use platform::Platform;
pub use registrar::{MemoryRegistry, Registration, Toolchain, ToolchainRegistry, register};
pub use release::{AssetRef, ReleaseDescriptor, ReleaseFetcher};
