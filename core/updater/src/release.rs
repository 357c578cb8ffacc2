//! Release metadata fetching.
//!
//! The feed is a GitHub-style "latest release" endpoint, one repository per
//! platform:
//!
//! ```text
//! GET {api_base}/repos/{owner}/{repo_prefix}-{selector}/releases/latest
//! ```
//!
//! ## Response Format
//!
//! Only two fields are read; both are mandatory:
//!
//! ```json
//! {
//!   "tag_name": "7.1.9",
//!   "assets": [
//!     { "browser_download_url": "https://github.com/.../php.tar.gz" }
//!   ]
//! }
//! ```
//!
//! The first asset is the installable archive. Tags are opaque and compared
//! by equality only.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::FeedConfig;
use crate::errors::{UpdateError, UpdateResult};
use crate::platform::Platform;

/// User-Agent header for HTTP requests.
pub(crate) const USER_AGENT: &str = concat!("php-latest-updater/", env!("CARGO_PKG_VERSION"));

/// Downloadable asset attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    /// Absolute download URL of the asset.
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
}

/// A published release as returned by the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDescriptor {
    /// Opaque version identifier.
    #[serde(rename = "tag_name")]
    pub tag: String,
    /// Assets in feed order.
    pub assets: Vec<AssetRef>,
}

impl ReleaseDescriptor {
    /// Parses and validates a feed response body.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::MalformedResponse`] if the body is not JSON,
    /// lacks `tag_name` or `assets`, has an empty tag or has no assets.
    pub fn from_json(body: &str) -> UpdateResult<Self> {
        let release: Self = serde_json::from_str(body)
            .map_err(|e| UpdateError::malformed(format!("Failed to parse release: {e}")))?;
        release.validate()?;
        Ok(release)
    }

    fn validate(&self) -> UpdateResult<()> {
        if self.tag.trim().is_empty() {
            return Err(UpdateError::malformed("release tag is empty"));
        }
        if self.assets.is_empty() {
            return Err(UpdateError::malformed("release has no assets"));
        }
        Ok(())
    }

    /// Returns the canonical installable archive.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::MalformedResponse`] if the release has no assets.
    pub fn primary_asset(&self) -> UpdateResult<&AssetRef> {
        self.assets
            .first()
            .ok_or_else(|| UpdateError::malformed("archive URL must be present"))
    }
}

/// Builds an HTTP client with the updater's defaults.
pub(crate) fn http_client(timeout: Duration, allow_http: bool) -> UpdateResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .https_only(!allow_http)
        .build()
        .map_err(|e| UpdateError::Transport {
            url: String::new(),
            source: e,
        })
}

/// Retrieves release metadata from the feed.
#[derive(Debug, Clone)]
pub struct ReleaseFetcher {
    feed: FeedConfig,
    platform: Platform,
}

impl ReleaseFetcher {
    /// Creates a fetcher for the given feed and platform.
    #[must_use]
    pub fn new(feed: FeedConfig, platform: Platform) -> Self {
        Self { feed, platform }
    }

    /// Returns the latest-release URL for the configured platform.
    #[must_use]
    pub fn latest_release_url(&self) -> String {
        let base = self.feed.api_base.trim().trim_end_matches('/');
        format!(
            "{base}/repos/{}/{}-{}/releases/latest",
            self.feed.owner,
            self.feed.repo_prefix,
            self.platform.feed_selector()
        )
    }

    /// Reads the optional credential. Absent or empty means unauthenticated.
    fn credential(&self) -> Option<String> {
        std::env::var(&self.feed.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
    }

    /// Fetches and validates the latest release.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::Unreachable`] if the feed host cannot be reached
    /// - [`UpdateError::Http`] on a non-success status
    /// - [`UpdateError::MalformedResponse`] if the body is not a valid release
    /// - [`UpdateError::Transport`] for any other transport failure
    pub async fn fetch(&self) -> UpdateResult<ReleaseDescriptor> {
        let url = self.latest_release_url();
        let client = http_client(self.feed.request_timeout(), self.feed.allow_http)?;

        let mut request = client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = self.credential() {
            tracing::debug!("Authenticating feed request with ${}", self.feed.token_env);
            request = request.header(reqwest::header::AUTHORIZATION, format!("Basic {token}"));
        }

        tracing::debug!("Requesting latest release from {url}");
        let response = request
            .send()
            .await
            .map_err(|e| UpdateError::from_request(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::http(status.as_u16(), &url));
        }

        let body = response
            .text()
            .await
            .map_err(|e| UpdateError::from_request(&url, e))?;

        let release = ReleaseDescriptor::from_json(&body)?;
        tracing::debug!(
            "Latest release is {} with {} asset(s)",
            release.tag,
            release.assets.len()
        );
        Ok(release)
    }
}
