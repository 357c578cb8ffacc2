//! Archive extraction for downloaded toolchains.
//!
//! Releases are published as gzip-compressed tarballs and are extracted as
//! they are, without moving entries around. Extraction is synchronous;
//! callers on an async runtime run it on a blocking thread.
//!
//! ## Containment
//!
//! Nothing is written outside the destination directory:
//!
//! - Entry paths must be relative and free of `..`
//! - Symlink targets must be relative and stay inside the destination
//! - Hard link sources are resolved against the destination, never the
//!   working directory
//! - Directories are created one level at a time, and any symlink met on
//!   the way must resolve inside the destination
//!
//! Device nodes and FIFOs are skipped.

use flate2::read::GzDecoder;
use std::path::{Component, Path, PathBuf};
use tar::{Archive, Entry};

use crate::errors::{UpdateError, UpdateResult};

/// Extracts a tar.gz archive into `dest_dir`, creating it if needed.
///
/// # Errors
///
/// Returns [`UpdateError::Extraction`] if:
/// - The archive cannot be opened or is not a valid tar.gz file (including a truncated download)
/// - An entry path or link target escapes the destination
/// - Directory, file or link creation fails
pub fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> UpdateResult<()> {
    std::fs::create_dir_all(dest_dir).map_err(|e| {
        UpdateError::extraction_io(format!("Failed to create directory: {}", dest_dir.display()), e)
    })?;
    let root = dest_dir.canonicalize().map_err(|e| {
        UpdateError::extraction_io(format!("Failed to resolve {}", dest_dir.display()), e)
    })?;

    let file = std::fs::File::open(archive_path).map_err(|e| {
        UpdateError::extraction_io(
            format!("Failed to open archive: {}", archive_path.display()),
            e,
        )
    })?;
    let mut archive = Archive::new(GzDecoder::new(file));
    let entries = archive.entries().map_err(|e| {
        UpdateError::extraction_io(
            format!("Failed to read tar entries: {}", archive_path.display()),
            e,
        )
    })?;

    let mut extracted = 0usize;
    for entry in entries {
        let mut entry = entry.map_err(|e| {
            UpdateError::extraction_io(
                format!("Failed to read tar entry: {}", archive_path.display()),
                e,
            )
        })?;
        if unpack_entry(&mut entry, &root)? {
            extracted += 1;
        }
    }

    tracing::debug!(
        "Extracted {extracted} entries from {} into {}",
        archive_path.display(),
        dest_dir.display()
    );
    Ok(())
}

/// Writes one entry below `root`. Returns `false` if the entry was skipped.
fn unpack_entry<R: std::io::Read>(entry: &mut Entry<'_, R>, root: &Path) -> UpdateResult<bool> {
    let raw = entry
        .path()
        .map_err(|e| UpdateError::extraction_io("Failed to get entry path", e))?
        .into_owned();
    let relative = contained(&raw)?;
    if relative.as_os_str().is_empty() {
        return Ok(false);
    }
    let output = root.join(&relative);
    let kind = entry.header().entry_type();

    if kind.is_dir() {
        create_dirs_inside(root, &relative)?;
        return Ok(true);
    }

    if let Some(parent) = relative.parent() {
        create_dirs_inside(root, parent)?;
    }

    if kind.is_symlink() {
        let target = link_target(entry, &raw)?;
        check_symlink_target(&relative, &target)?;
        remove_existing(&output)?;
        entry.unpack(&output).map_err(|e| {
            UpdateError::extraction_io(format!("Failed to create symlink: {}", output.display()), e)
        })?;
    } else if kind.is_hard_link() {
        let target = link_target(entry, &raw)?;
        let source = root.join(contained(&target)?);
        let resolved = resolve_inside(root, &source)?;
        remove_existing(&output)?;
        std::fs::hard_link(&resolved, &output).map_err(|e| {
            UpdateError::extraction_io(
                format!(
                    "Failed to link {} to {}",
                    output.display(),
                    resolved.display()
                ),
                e,
            )
        })?;
    } else if kind.is_file() || kind.is_contiguous() || kind.is_gnu_sparse() {
        remove_existing(&output)?;
        entry.unpack(&output).map_err(|e| {
            UpdateError::extraction_io(format!("Failed to extract: {}", output.display()), e)
        })?;
    } else {
        tracing::debug!("Skipping special entry {}", raw.display());
        return Ok(false);
    }
    Ok(true)
}

/// Normalizes an archive path, rejecting anything that is not a plain
/// relative path. `.` components are dropped.
fn contained(path: &Path) -> UpdateResult<PathBuf> {
    let mut relative = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(UpdateError::extraction(format!(
                    "Refusing to extract path with parent directory or absolute reference: {}",
                    path.display()
                )));
            }
        }
    }
    Ok(relative)
}

fn link_target<R: std::io::Read>(entry: &Entry<'_, R>, raw: &Path) -> UpdateResult<PathBuf> {
    entry
        .link_name()
        .map_err(|e| UpdateError::extraction_io("Failed to get link target", e))?
        .map(std::borrow::Cow::into_owned)
        .ok_or_else(|| {
            UpdateError::extraction(format!("Link without target: {}", raw.display()))
        })
}

/// Rejects symlink targets that are absolute or climb above the destination
/// when resolved from the link's own directory.
fn check_symlink_target(relative: &Path, target: &Path) -> UpdateResult<()> {
    let escape = || {
        UpdateError::extraction(format!(
            "Refusing symlink leaving the destination: {} -> {}",
            relative.display(),
            target.display()
        ))
    };
    let mut depth = relative.components().count().saturating_sub(1);
    for component in target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => depth = depth.checked_sub(1).ok_or_else(escape)?,
            Component::RootDir | Component::Prefix(_) => return Err(escape()),
        }
    }
    Ok(())
}

/// Creates `root/relative` one directory at a time. An existing symlink on
/// the way is followed only if it resolves to a directory inside `root`.
fn create_dirs_inside(root: &Path, relative: &Path) -> UpdateResult<()> {
    let mut current = root.to_path_buf();
    for component in relative.components() {
        current.push(component);
        match std::fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                if !resolve_inside(root, &current)?.is_dir() {
                    return Err(UpdateError::extraction(format!(
                        "Not a directory: {}",
                        current.display()
                    )));
                }
            }
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(UpdateError::extraction(format!(
                    "Not a directory: {}",
                    current.display()
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                std::fs::create_dir(&current).map_err(|e| {
                    UpdateError::extraction_io(
                        format!("Failed to create directory: {}", current.display()),
                        e,
                    )
                })?;
            }
            Err(e) => {
                return Err(UpdateError::extraction_io(
                    format!("Failed to inspect {}", current.display()),
                    e,
                ));
            }
        }
    }
    Ok(())
}

/// Resolves `path` and requires the result to lie inside `root`.
fn resolve_inside(root: &Path, path: &Path) -> UpdateResult<PathBuf> {
    let resolved = path.canonicalize().map_err(|e| {
        UpdateError::extraction_io(format!("Failed to resolve {}", path.display()), e)
    })?;
    if resolved.starts_with(root) {
        Ok(resolved)
    } else {
        Err(UpdateError::extraction(format!(
            "Refusing to write through {}: it resolves outside the destination",
            path.display()
        )))
    }
}

/// Removes a file or link left at `path` by an earlier entry.
fn remove_existing(path: &Path) -> UpdateResult<()> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => Err(UpdateError::extraction(format!(
            "Entry would replace a directory: {}",
            path.display()
        ))),
        Ok(_) => std::fs::remove_file(path).map_err(|e| {
            UpdateError::extraction_io(format!("Failed to replace {}", path.display()), e)
        }),
        Err(_) => Ok(()),
    }
}

/// Marks a file executable (`0o755`). Does nothing on non-Unix systems.
///
/// # Errors
///
/// Returns an error if the file metadata cannot be read or permissions cannot be set.
#[cfg(unix)]
pub fn ensure_executable(path: &Path) -> UpdateResult<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(path)
        .map_err(|e| UpdateError::io("Failed to read metadata", path, e))?;
    let mut permissions = metadata.permissions();
    if permissions.mode() & 0o111 == 0o111 {
        return Ok(());
    }
    permissions.set_mode(0o755);
    std::fs::set_permissions(path, permissions)
        .map_err(|e| UpdateError::io("Failed to set permissions", path, e))
}

/// Marks a file executable (`0o755`). Does nothing on non-Unix systems.
///
/// # Errors
///
/// Never fails on this platform.
#[cfg(not(unix))]
pub fn ensure_executable(_path: &Path) -> UpdateResult<()> {
    Ok(())
}
