//! Install-path substitution in extracted files.
//!
//! Release archives are built relocatable: the launcher script and some
//! configuration fragments contain the literal `$(pwd)` where the absolute
//! install path belongs. After extraction every occurrence is replaced with
//! the toolchain directory.

use std::path::Path;

use crate::errors::{UpdateError, UpdateResult};
use crate::platform::{Platform, TemplateTarget};

/// Placeholder standing for the install directory.
pub const PLACEHOLDER: &str = "$(pwd)";

/// Replaces every placeholder in `path` with `replacement`, rewriting the file in place.
///
/// The file is treated as bytes, so content that is not valid UTF-8 is kept
/// as it is. Files without a placeholder are not rewritten.
///
/// Returns `Ok(false)` without touching anything if the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or written.
pub fn substitute_file(path: &Path, replacement: &str) -> UpdateResult<bool> {
    let content = match std::fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("Skipping missing template {}", path.display());
            return Ok(false);
        }
        Err(e) => return Err(UpdateError::io("Failed to read template", path, e)),
    };

    if let Some(rewritten) = replace_placeholder(&content, replacement.as_bytes()) {
        std::fs::write(path, rewritten)
            .map_err(|e| UpdateError::io("Failed to write template", path, e))?;
    }
    Ok(true)
}

/// Returns `content` with every placeholder replaced, or `None` if there is none.
fn replace_placeholder(content: &[u8], replacement: &[u8]) -> Option<Vec<u8>> {
    let token = PLACEHOLDER.as_bytes();
    let mut out = Vec::with_capacity(content.len());
    let mut rest = content;
    let mut found = false;
    while let Some(at) = rest.windows(token.len()).position(|w| w == token) {
        out.extend_from_slice(&rest[..at]);
        out.extend_from_slice(replacement);
        rest = &rest[at + token.len()..];
        found = true;
    }
    if !found {
        return None;
    }
    out.extend_from_slice(rest);
    Some(out)
}

/// Substitutes the install path into the launcher and the platform's
/// configuration fragments. Returns the number of files rewritten.
///
/// # Errors
///
/// Returns an error if an existing target cannot be read or written.
pub fn apply_templates(
    toolchain_dir: &Path,
    launcher: &Path,
    platform: Platform,
) -> UpdateResult<usize> {
    let replacement = toolchain_dir.to_string_lossy();
    let mut rewritten = usize::from(substitute_file(launcher, &replacement)?);

    for target in platform.template_targets() {
        match *target {
            TemplateTarget::File(relative) => {
                rewritten += usize::from(substitute_file(
                    &toolchain_dir.join(relative),
                    &replacement,
                )?);
            }
            TemplateTarget::Dir(relative) => {
                let dir = toolchain_dir.join(relative);
                let entries = match std::fs::read_dir(&dir) {
                    Ok(entries) => entries,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(e) => return Err(UpdateError::io("Failed to read directory", &dir, e)),
                };
                for entry in entries {
                    let entry =
                        entry.map_err(|e| UpdateError::io("Failed to read directory", &dir, e))?;
                    let path = entry.path();
                    if path.is_file() {
                        rewritten += usize::from(substitute_file(&path, &replacement)?);
                    }
                }
            }
        }
    }

    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitute_file_replaces_every_occurrence() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let file = dir.path().join("php.sh");
        std::fs::write(
            &file,
            "#!/bin/sh\nexport PHPRC=$(pwd)/etc\nexec $(pwd)/bin/php \"$@\"\n",
        )
        .expect("Should write");

        assert!(substitute_file(&file, "/opt/php-7.1.9").expect("Should substitute"));

        assert_eq!(
            std::fs::read_to_string(&file).expect("Should read"),
            "#!/bin/sh\nexport PHPRC=/opt/php-7.1.9/etc\nexec /opt/php-7.1.9/bin/php \"$@\"\n"
        );
    }

    #[test]
    fn substitute_file_leaves_text_without_token_alone() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let file = dir.path().join("php.ini");
        std::fs::write(&file, "memory_limit = $(memory)\n").expect("Should write");

        substitute_file(&file, "/opt/php").expect("Should substitute");

        assert_eq!(
            std::fs::read_to_string(&file).expect("Should read"),
            "memory_limit = $(memory)\n"
        );
    }

    #[test]
    fn substitute_file_keeps_non_utf8_bytes() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let file = dir.path().join("20-xdebug.ini");
        std::fs::write(&file, b"; caf\xe9\nzend_extension=$(pwd)/xdebug.so\n").expect("Should write");

        assert!(substitute_file(&file, "/opt/php").expect("Should substitute"));

        assert_eq!(
            std::fs::read(&file).expect("Should read"),
            b"; caf\xe9\nzend_extension=/opt/php/xdebug.so\n".to_vec()
        );
    }

    #[test]
    fn replace_placeholder_handles_adjacent_tokens() {
        assert_eq!(
            replace_placeholder(b"$(pwd)$(pwd)/x", b"/a"),
            Some(b"/a/a/x".to_vec())
        );
        assert_eq!(replace_placeholder(b"$(pw", b"/a"), None);
    }

    #[test]
    fn substitute_file_skips_missing_file() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let file = dir.path().join("absent.ini");

        assert!(!substitute_file(&file, "/opt/php").expect("Should skip"));
        assert!(!file.exists());
    }

    #[test]
    fn apply_templates_rewrites_linux_conf_d() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let root = dir.path();
        let conf_d = root.join("etc/php/7.1/cli/conf.d");
        std::fs::create_dir_all(&conf_d).expect("Should create dirs");
        std::fs::write(root.join("php.sh"), "exec $(pwd)/bin/php").expect("Should write");
        std::fs::write(conf_d.join("20-xdebug.ini"), "zend_extension=$(pwd)/xdebug.so")
            .expect("Should write");
        std::fs::write(conf_d.join("10-opcache.ini"), "opcache.enable=1").expect("Should write");

        let rewritten = apply_templates(root, &root.join("php.sh"), Platform::Linux)
            .expect("Should apply templates");

        assert_eq!(rewritten, 3);
        let xdebug = std::fs::read_to_string(conf_d.join("20-xdebug.ini")).expect("Should read");
        assert_eq!(xdebug, format!("zend_extension={}/xdebug.so", root.display()));
        let opcache = std::fs::read_to_string(conf_d.join("10-opcache.ini")).expect("Should read");
        assert_eq!(opcache, "opcache.enable=1");
    }

    #[test]
    fn apply_templates_skips_targets_missing_for_platform() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let root = dir.path();
        std::fs::write(root.join("php.sh"), "exec $(pwd)/bin/php").expect("Should write");

        let rewritten =
            apply_templates(root, &root.join("php.sh"), Platform::Mac).expect("Should apply");

        assert_eq!(rewritten, 1);
    }
}
