//! Boundary between the updater and the application hosting it.
//!
//! The orchestrator never talks to concrete host types. It asks the host
//! whether its context is still alive, whether it is a placeholder context,
//! and hands it notifications. Background work runs on tokio tasks.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::registrar::ToolchainRegistry;

/// Execution context the updater runs for.
pub trait HostContext: Send + Sync {
    /// Returns `false` once the context has been torn down.
    fn is_live(&self) -> bool;

    /// Returns `true` for a generic placeholder context that must not trigger updates.
    fn is_default_context(&self) -> bool {
        false
    }
}

/// Follow-up a notification offers the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationAction {
    /// Open the toolchain configuration.
    Configure,
}

impl NotificationAction {
    /// Label shown for the action.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Configure => "Configure",
        }
    }
}

/// User-visible message emitted after a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Title, the registered toolchain name.
    pub title: String,
    /// Newly installed version.
    pub version: String,
    /// Launcher of the new installation.
    pub executable: PathBuf,
    /// Attached action.
    pub action: NotificationAction,
}

impl Notification {
    /// Creates the "new version installed" notification.
    #[must_use]
    pub fn installed(
        title: impl Into<String>,
        version: impl Into<String>,
        executable: impl Into<PathBuf>,
    ) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            executable: executable.into(),
            action: NotificationAction::Configure,
        }
    }

    /// Message body.
    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "The latest PHP interpreter {} has been downloaded. Would you like to configure it?",
            self.version
        )
    }
}

/// Delivers notifications to the user.
pub trait Notifier: Send + Sync {
    /// Shows `notification`. The result is not observed by the updater.
    fn notify(&self, notification: Notification);
}

/// Everything the orchestrator needs from its host.
#[derive(Clone)]
pub struct HostServices {
    /// Liveness and kind of the hosting context.
    pub context: Arc<dyn HostContext>,
    /// Named toolchain list to register the launcher in.
    pub registry: Arc<dyn ToolchainRegistry>,
    /// Sink for user-visible notifications.
    pub notifier: Arc<dyn Notifier>,
}

/// A context whose liveness is a flag flipped by the host on shutdown.
#[derive(Debug)]
pub struct LivenessFlag {
    live: AtomicBool,
    default_context: bool,
}

impl LivenessFlag {
    /// Creates a live, non-default context.
    #[must_use]
    pub fn new() -> Self {
        Self {
            live: AtomicBool::new(true),
            default_context: false,
        }
    }

    /// Creates a live placeholder context.
    #[must_use]
    pub fn default_context() -> Self {
        Self {
            live: AtomicBool::new(true),
            default_context: true,
        }
    }

    /// Marks the context as torn down.
    pub fn dispose(&self) {
        self.live.store(false, Ordering::SeqCst);
    }
}

impl Default for LivenessFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl HostContext for LivenessFlag {
    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn is_default_context(&self) -> bool {
        self.default_context
    }
}
