//! Version-gated refresh of the cached toolchain.
//!
//! One update cycle moves through these states:
//!
//! ```text
//! Idle -> CheckingVersion -> UpToDate
//!                         -> Refreshing -> Installed
//!                                       -> Failed
//! ```
//!
//! The version check (fetch + cache inspection) and the install run as two
//! sequential tokio tasks. Registration and the notification happen after
//! the install task has completed, and only while the host context is live.
//!
//! ## Refresh Order
//!
//! 1. Delete the cache root
//! 2. Create `<prefix><tag>`
//! 3. Download, extract, delete archive, substitute paths
//! 4. Register the launcher and notify
//!
//! No step starts before the previous one has succeeded. A failure is
//! surfaced to the caller and the next cycle starts from scratch, since the
//! inspector will not find a complete installation.

use std::path::{Path, PathBuf};

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheRoot, CacheState};
use crate::config::UpdaterConfig;
use crate::download::{ProgressCallback, silent_progress};
use crate::errors::{UpdateError, UpdateResult};
use crate::host::{HostServices, Notification};
use crate::installer::ArchiveInstaller;
use crate::platform::Platform;
use crate::registrar::register;
use crate::release::{ReleaseDescriptor, ReleaseFetcher};

/// Where the orchestrator is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    /// Not running, or finished without effect.
    Idle,
    /// Fetching the latest release and inspecting the cache.
    CheckingVersion,
    /// The cached toolchain matches the latest release.
    UpToDate,
    /// Replacing the cached toolchain.
    Refreshing,
    /// A new toolchain was installed and registered.
    Installed,
    /// The cycle failed with a surfaced error.
    Failed,
}

/// Why a cycle did not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No builds are published for this platform.
    UnsupportedPlatform,
    /// The host context is a placeholder.
    DefaultContext,
}

/// Result of a completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The cycle never started.
    Skipped(SkipReason),
    /// The release feed was unreachable; nothing changed.
    Offline,
    /// The installed toolchain is current and registered.
    UpToDate {
        /// Installed version.
        version: String,
        /// Registered launcher.
        executable: PathBuf,
    },
    /// A new toolchain was installed, registered and announced.
    Installed {
        /// Installed version.
        version: String,
        /// Registered launcher.
        executable: PathBuf,
    },
    /// The host context went away before registration.
    Abandoned {
        /// Version that was being handled.
        version: String,
    },
    /// Another cycle is already running in this process.
    Busy,
}

/// Result of the version-check task.
struct VersionCheck {
    release: ReleaseDescriptor,
    local: CacheState,
}

/// Keeps the cached toolchain in sync with the latest release.
pub struct UpdateOrchestrator {
    platform: Platform,
    toolchain_name: String,
    fetcher: ReleaseFetcher,
    cache: CacheRoot,
    installer: ArchiveInstaller,
    host: HostServices,
    progress: ProgressCallback,
    cancel: CancellationToken,
    cycle_lock: Mutex<()>,
    state: watch::Sender<UpdateState>,
}

impl UpdateOrchestrator {
    /// Creates an orchestrator managing `cache_root`.
    #[must_use]
    pub fn new(
        config: &UpdaterConfig,
        cache_root: PathBuf,
        platform: Platform,
        host: HostServices,
    ) -> Self {
        let (state, _) = watch::channel(UpdateState::Idle);
        Self {
            platform,
            toolchain_name: config.toolchain_name.clone(),
            fetcher: ReleaseFetcher::new(config.feed.clone(), platform),
            cache: CacheRoot::new(cache_root, config.layout.clone()),
            installer: ArchiveInstaller::new(platform, &config.feed, &config.layout.archive_name),
            host,
            progress: silent_progress(),
            cancel: CancellationToken::new(),
            cycle_lock: Mutex::new(()),
            state,
        }
    }

    /// Reports download progress to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    /// Aborts an in-flight download when `cancel` fires.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns the managed cache root.
    #[must_use]
    pub fn cache(&self) -> &CacheRoot {
        &self.cache
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> UpdateState {
        *self.state.borrow()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<UpdateState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: UpdateState) {
        tracing::debug!("Update state: {state:?}");
        self.state.send_replace(state);
    }

    fn fail(&self, error: UpdateError) -> UpdateError {
        self.set_state(UpdateState::Failed);
        error
    }

    /// Runs the cycle in the background once the host is ready.
    ///
    /// The returned handle can be dropped; failures are also logged.
    pub fn spawn_on_startup(self: std::sync::Arc<Self>) -> JoinHandle<UpdateResult<CycleOutcome>> {
        tokio::spawn(async move {
            let result = self.run_cycle().await;
            if let Err(e) = &result {
                tracing::error!("Toolchain update failed: {e}");
            }
            result
        })
    }

    /// Runs one update cycle to completion.
    ///
    /// # Errors
    ///
    /// Returns every failure except an unreachable feed, which yields
    /// [`CycleOutcome::Offline`].
    pub async fn run_cycle(&self) -> UpdateResult<CycleOutcome> {
        if !self.platform.is_supported() {
            tracing::debug!("Skipping update: unsupported platform");
            return Ok(CycleOutcome::Skipped(SkipReason::UnsupportedPlatform));
        }
        if self.host.context.is_default_context() {
            tracing::debug!("Skipping update: default context");
            return Ok(CycleOutcome::Skipped(SkipReason::DefaultContext));
        }
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            tracing::info!("Update cycle already in progress");
            return Ok(CycleOutcome::Busy);
        };

        self.set_state(UpdateState::CheckingVersion);
        let VersionCheck { release, local } = match self.check_version().await {
            Ok(check) => check,
            Err(e) if e.is_benign() => {
                tracing::info!("{e}");
                self.set_state(UpdateState::Idle);
                return Ok(CycleOutcome::Offline);
            }
            Err(e) => return Err(self.fail(e)),
        };

        match local {
            CacheState::Installed {
                version,
                executable,
            } if version == release.tag => {
                self.set_state(UpdateState::UpToDate);
                self.keep_current(version, executable)
                    .map_err(|e| self.fail(e))
            }
            other => {
                match &other {
                    CacheState::Ambiguous { versions } => tracing::warn!(
                        "Found several cached toolchains ({}), reinstalling",
                        versions.join(", ")
                    ),
                    CacheState::Installed { version, .. } => {
                        tracing::info!("Updating cached toolchain {version} -> {}", release.tag);
                    }
                    CacheState::Empty => tracing::info!("Installing toolchain {}", release.tag),
                }
                self.set_state(UpdateState::Refreshing);
                self.refresh(&release).await.map_err(|e| self.fail(e))
            }
        }
    }

    /// Fetches the latest release and inspects the cache on a background task.
    async fn check_version(&self) -> UpdateResult<VersionCheck> {
        let fetcher = self.fetcher.clone();
        let cache = self.cache.clone();
        tokio::spawn(async move {
            let release = fetcher.fetch().await?;
            let local = cache.inspect();
            Ok::<_, UpdateError>(VersionCheck { release, local })
        })
        .await
        .map_err(|e| UpdateError::task(format!("version check failed: {e}")))?
    }

    fn keep_current(&self, version: String, executable: PathBuf) -> UpdateResult<CycleOutcome> {
        if !self.host.context.is_live() {
            return Ok(self.abandon(version));
        }
        register(
            self.host.registry.as_ref(),
            &self.toolchain_name,
            &executable,
        )?;
        tracing::debug!("Toolchain {version} is up to date");
        Ok(CycleOutcome::UpToDate {
            version,
            executable,
        })
    }

    fn abandon(&self, version: String) -> CycleOutcome {
        tracing::info!("Host context closed, not registering toolchain {version}");
        self.set_state(UpdateState::Idle);
        CycleOutcome::Abandoned { version }
    }

    async fn refresh(&self, release: &ReleaseDescriptor) -> UpdateResult<CycleOutcome> {
        let asset = release.primary_asset()?.clone();
        let version = release.tag.clone();

        self.cache.clear()?;
        let toolchain_dir = self.cache.create_toolchain_dir(&version)?;
        let executable = self.cache.executable(&toolchain_dir);

        let installer = self.installer.clone();
        let progress = self.progress.clone();
        let cancel = self.cancel.clone();
        let (dir, exe) = (toolchain_dir.clone(), executable.clone());
        let installed = tokio::spawn(async move {
            installer
                .install(&dir, &exe, &asset, progress, &cancel)
                .await
        })
        .await
        .map_err(|e| UpdateError::task(format!("install failed: {e}")))
        .and_then(std::convert::identity);

        if let Err(e) = installed {
            discard(&toolchain_dir);
            return Err(e);
        }

        if !self.host.context.is_live() {
            return Ok(self.abandon(version));
        }

        register(
            self.host.registry.as_ref(),
            &self.toolchain_name,
            &executable,
        )?;
        self.host.notifier.notify(Notification::installed(
            &self.toolchain_name,
            &version,
            &executable,
        ));
        self.set_state(UpdateState::Installed);
        tracing::info!("Installed toolchain {version} at {}", toolchain_dir.display());

        Ok(CycleOutcome::Installed {
            version,
            executable,
        })
    }
}

/// Removes a half-installed toolchain directory. Failures are only logged;
/// the next cycle clears the whole cache root anyway.
fn discard(toolchain_dir: &Path) {
    if let Err(e) = std::fs::remove_dir_all(toolchain_dir)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(
            "Failed to remove incomplete toolchain {}: {e}",
            toolchain_dir.display()
        );
    }
}
