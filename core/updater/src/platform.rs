//! Platform selection for the PHP release feed.
//!
//! Releases are published per OS family in separate repositories
//! (`php-latest-linux`, `php-latest-mac`). The selector is resolved once
//! from the compile target and baked into the feed URL.
//!
//! ## Supported Platforms
//!
//! - Linux (`linux`)
//! - macOS (`mac`)
//!
//! Anything else maps to [`Platform::Unsupported`], whose selector yields a
//! feed URL that does not exist.

use std::fmt;

/// Placeholder target inside an extracted toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateTarget {
    /// A single file, relative to the toolchain directory.
    File(&'static str),
    /// Every regular file directly inside a directory, relative to the toolchain directory.
    Dir(&'static str),
}

/// OS family the cached toolchain is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Linux distributions
    Linux,
    /// macOS
    Mac,
    /// Any OS without published builds
    Unsupported,
}

impl Platform {
    /// Detects the current platform based on compile-time configuration.
    #[must_use]
    pub fn detect() -> Self {
        if cfg!(target_os = "macos") {
            Self::Mac
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else {
            Self::Unsupported
        }
    }

    /// Returns the selector used in the feed repository name.
    #[must_use = "returns the selector string without side effects"]
    pub fn feed_selector(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Mac => "mac",
            Self::Unsupported => "unsupported",
        }
    }

    /// Returns whether builds are published for this platform.
    #[must_use = "returns platform check result without side effects"]
    pub fn is_supported(self) -> bool {
        !matches!(self, Self::Unsupported)
    }

    /// Returns the extracted files that carry the `$(pwd)` placeholder,
    /// in addition to the launcher script.
    #[must_use]
    pub fn template_targets(self) -> &'static [TemplateTarget] {
        match self {
            Self::Mac => &[TemplateTarget::File("ini/conf.d/ext-xdebug.ini")],
            Self::Linux => &[TemplateTarget::Dir("etc/php/7.1/cli/conf.d")],
            Self::Unsupported => &[],
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.feed_selector())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_selector_returns_expected_values() {
        assert_eq!(Platform::Linux.feed_selector(), "linux");
        assert_eq!(Platform::Mac.feed_selector(), "mac");
        assert_eq!(Platform::Unsupported.feed_selector(), "unsupported");
    }

    #[test]
    fn display_matches_selector() {
        assert_eq!(format!("{}", Platform::Mac), "mac");
    }

    #[test]
    fn only_unsupported_is_not_supported() {
        assert!(Platform::Linux.is_supported());
        assert!(Platform::Mac.is_supported());
        assert!(!Platform::Unsupported.is_supported());
    }

    #[test]
    fn detect_matches_target_os() {
        let platform = Platform::detect();
        #[cfg(target_os = "linux")]
        assert_eq!(platform, Platform::Linux);
        #[cfg(target_os = "macos")]
        assert_eq!(platform, Platform::Mac);
        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        assert_eq!(platform, Platform::Unsupported);
    }

    #[test]
    fn template_targets_are_platform_specific() {
        assert_eq!(
            Platform::Mac.template_targets(),
            &[TemplateTarget::File("ini/conf.d/ext-xdebug.ini")]
        );
        assert_eq!(
            Platform::Linux.template_targets(),
            &[TemplateTarget::Dir("etc/php/7.1/cli/conf.d")]
        );
        assert!(Platform::Unsupported.template_targets().is_empty());
    }
}
