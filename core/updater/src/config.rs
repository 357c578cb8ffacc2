//! Updater configuration.
//!
//! The configuration lives in `<home>/config.toml`. Every field has a
//! default, so a missing file is equivalent to an empty one.
//!
//! ## Home Directory
//!
//! ```text
//! <home>/                     # PHP_LATEST_HOME or <data dir>/php-latest
//!   config.toml               # Optional overrides (this module)
//!   toolchains.json           # Registry kept by the terminal host
//!   cache/                    # Cache root, owned by the orchestrator
//!     php-<tag>/
//!       php.sh
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{UpdateError, UpdateResult};

/// Environment variable to override the home directory.
pub const HOME_ENV: &str = "PHP_LATEST_HOME";

/// Environment variable to override the feed base URL.
pub const FEED_ENV: &str = "PHP_LATEST_FEED";

/// Configuration file name inside the home directory.
pub const CONFIG_FILE: &str = "config.toml";

const DEFAULT_API_BASE: &str = "https://api.github.com";
const DEFAULT_OWNER: &str = "artspb";
const DEFAULT_REPO_PREFIX: &str = "php-latest";
const DEFAULT_TOKEN_ENV: &str = "GITHUB_PAT";
const DEFAULT_TOOLCHAIN_NAME: &str = "PHP latest";

/// Location of the release feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Base URL of the releases API.
    pub api_base: String,
    /// Owner of the per-platform release repositories.
    pub owner: String,
    /// Repository name prefix; the platform selector is appended with a dash.
    pub repo_prefix: String,
    /// Environment variable holding an optional credential.
    pub token_env: String,
    /// Accept plain `http://` URLs. Only meant for local mirrors.
    pub allow_http: bool,
    /// Timeout for the release metadata request, in seconds.
    pub request_timeout_secs: u64,
    /// Timeout for the archive download, in seconds.
    pub download_timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            owner: DEFAULT_OWNER.to_string(),
            repo_prefix: DEFAULT_REPO_PREFIX.to_string(),
            token_env: DEFAULT_TOKEN_ENV.to_string(),
            allow_http: false,
            request_timeout_secs: 30,
            download_timeout_secs: 600,
        }
    }
}

impl FeedConfig {
    /// Returns the metadata request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Returns the download timeout.
    #[must_use]
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

/// Naming convention of an installed toolchain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainLayout {
    /// Prefix of the versioned directory (`<prefix><tag>`).
    pub dir_prefix: String,
    /// Launcher file name relative to the versioned directory.
    pub launcher: String,
    /// Name of the temporary archive written during install.
    pub archive_name: String,
}

impl Default for ToolchainLayout {
    fn default() -> Self {
        Self {
            dir_prefix: "php-".to_string(),
            launcher: "php.sh".to_string(),
            archive_name: "php.tar.gz".to_string(),
        }
    }
}

/// Complete updater configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    /// Cache root; defaults to `<home>/cache` when unset.
    pub cache_root: Option<PathBuf>,
    /// Name under which the toolchain is registered with the host.
    pub toolchain_name: String,
    /// Release feed settings.
    pub feed: FeedConfig,
    /// Installed toolchain naming.
    pub layout: ToolchainLayout,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            cache_root: None,
            toolchain_name: DEFAULT_TOOLCHAIN_NAME.to_string(),
            feed: FeedConfig::default(),
            layout: ToolchainLayout::default(),
        }
    }
}

impl UpdaterConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Config`] if the text is not valid TOML for this schema.
    pub fn from_toml(text: &str, origin: &Path) -> UpdateResult<Self> {
        toml::from_str(text).map_err(|e| UpdateError::Config {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Loads `<home>/config.toml`, falling back to defaults if it does not
    /// exist, then applies the `PHP_LATEST_FEED` override.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(home: &Path) -> UpdateResult<Self> {
        let path = home.join(CONFIG_FILE);
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| UpdateError::io("Failed to read configuration", &path, e))?;
            Self::from_toml(&text, &path)?
        } else {
            tracing::debug!("No configuration at {}, using defaults", path.display());
            Self::default()
        };

        if let Some(feed) = std::env::var(FEED_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty())
        {
            config.feed.api_base = feed.trim().trim_end_matches('/').to_string();
        }

        Ok(config)
    }

    /// Returns the cache root for the given home directory.
    #[must_use]
    pub fn cache_root(&self, home: &Path) -> PathBuf {
        self.cache_root
            .clone()
            .unwrap_or_else(|| home.join("cache"))
    }
}

/// Resolves the home directory.
///
/// The directory is determined by:
/// 1. The `PHP_LATEST_HOME` environment variable if set
/// 2. The platform data directory joined with `php-latest`
///
/// Returns `None` if neither is available.
#[must_use]
pub fn default_home() -> Option<PathBuf> {
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(home));
    }
    dirs::data_dir().map(|d| d.join("php-latest"))
}
