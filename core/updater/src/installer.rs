//! Download-and-install of a single toolchain release.
//!
//! ## Process
//!
//! 1. Download the asset to a temporary archive inside the target directory
//! 2. Extract the archive into the target directory
//! 3. Delete the temporary archive
//! 4. Substitute the install path into the launcher and configuration fragments
//!
//! Each step is a precondition for the next and any failure aborts the
//! install. The target directory must be freshly created; installing over
//! an existing toolchain is not supported.

use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::archive::{ensure_executable, extract_tar_gz};
use crate::config::FeedConfig;
use crate::download::{DownloadOptions, ProgressCallback, download_file};
use crate::errors::{UpdateError, UpdateResult};
use crate::platform::Platform;
use crate::release::AssetRef;
use crate::template::apply_templates;

/// Installs release archives into versioned directories.
#[derive(Debug, Clone)]
pub struct ArchiveInstaller {
    platform: Platform,
    options: DownloadOptions,
    archive_name: String,
}

impl ArchiveInstaller {
    /// Creates an installer for `platform`.
    ///
    /// `archive_name` is the file name of the temporary archive inside the
    /// target directory.
    #[must_use]
    pub fn new(platform: Platform, feed: &FeedConfig, archive_name: impl Into<String>) -> Self {
        Self {
            platform,
            options: DownloadOptions {
                timeout: feed.download_timeout(),
                allow_http: feed.allow_http,
            },
            archive_name: archive_name.into(),
        }
    }

    /// Downloads, extracts and templates `asset` into `target_dir`.
    ///
    /// `executable` is the launcher path inside `target_dir`.
    ///
    /// # Errors
    ///
    /// Returns the error of the first step that fails; later steps are not run.
    pub async fn install(
        &self,
        target_dir: &Path,
        executable: &Path,
        asset: &AssetRef,
        progress: ProgressCallback,
        cancel: &CancellationToken,
    ) -> UpdateResult<()> {
        let archive = target_dir.join(&self.archive_name);

        tracing::info!("Downloading {}", asset.download_url);
        download_file(&asset.download_url, &archive, self.options, progress, cancel).await?;

        if cancel.is_cancelled() {
            return Err(UpdateError::cancelled("install before extraction"));
        }

        let target = target_dir.to_path_buf();
        let executable = executable.to_path_buf();
        let platform = self.platform;
        tokio::task::spawn_blocking(move || unpack(&archive, &target, &executable, platform))
            .await
            .map_err(|e| UpdateError::task(format!("extraction task failed: {e}")))?
    }
}

/// Blocking tail of the install: extract, delete archive, substitute.
fn unpack(
    archive: &Path,
    target_dir: &Path,
    executable: &Path,
    platform: Platform,
) -> UpdateResult<()> {
    extract_tar_gz(archive, target_dir)?;

    std::fs::remove_file(archive)
        .map_err(|e| UpdateError::io("Unable to delete a file", archive, e))?;

    let rewritten = apply_templates(target_dir, executable, platform)?;
    tracing::debug!("Substituted install path into {rewritten} file(s)");

    if executable.is_file() {
        ensure_executable(executable)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::silent_progress;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tar_gz(files: &[(&str, &str)]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, body) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, name, body.as_bytes())
                .expect("Should append file");
        }
        builder
            .into_inner()
            .expect("Should finish tar")
            .finish()
            .expect("Should finish gzip")
    }

    fn installer() -> ArchiveInstaller {
        let feed = FeedConfig {
            allow_http: true,
            ..FeedConfig::default()
        };
        ArchiveInstaller::new(Platform::Linux, &feed, "php.tar.gz")
    }

    async fn serve(body: Vec<u8>) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/php.tar.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn install_extracts_and_substitutes() {
        let server = serve(tar_gz(&[
            ("php.sh", "#!/bin/sh\nexec $(pwd)/bin/php \"$@\"\n"),
            ("etc/php/7.1/cli/conf.d/20-xdebug.ini", "zend_extension=$(pwd)/x.so\n"),
        ]))
        .await;
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let target = dir.path().join("php-7.1.9");
        std::fs::create_dir_all(&target).expect("Should create dir");
        let exe = target.join("php.sh");
        let asset = AssetRef {
            download_url: format!("{}/php.tar.gz", server.uri()),
        };

        installer()
            .install(&target, &exe, &asset, silent_progress(), &CancellationToken::new())
            .await
            .expect("Should install");

        assert!(!target.join("php.tar.gz").exists());
        let launcher = std::fs::read_to_string(&exe).expect("Should read launcher");
        assert_eq!(
            launcher,
            format!("#!/bin/sh\nexec {}/bin/php \"$@\"\n", target.display())
        );
        let ini = std::fs::read_to_string(target.join("etc/php/7.1/cli/conf.d/20-xdebug.ini"))
            .expect("Should read ini");
        assert_eq!(ini, format!("zend_extension={}/x.so\n", target.display()));
    }

    #[tokio::test]
    async fn corrupt_archive_fails_install() {
        let server = serve(b"not an archive".to_vec()).await;
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let target = dir.path().join("php-7.1.9");
        std::fs::create_dir_all(&target).expect("Should create dir");
        let asset = AssetRef {
            download_url: format!("{}/php.tar.gz", server.uri()),
        };

        let err = installer()
            .install(
                &target,
                &target.join("php.sh"),
                &asset,
                silent_progress(),
                &CancellationToken::new(),
            )
            .await
            .expect_err("Should fail");

        assert!(matches!(err, UpdateError::Extraction { .. }));
        assert!(!target.join("php.sh").exists());
    }

    #[tokio::test]
    async fn failed_download_does_not_extract() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let target = dir.path().join("php-7.1.9");
        std::fs::create_dir_all(&target).expect("Should create dir");
        let asset = AssetRef {
            download_url: format!("{}/php.tar.gz", server.uri()),
        };

        let err = installer()
            .install(
                &target,
                &target.join("php.sh"),
                &asset,
                silent_progress(),
                &CancellationToken::new(),
            )
            .await
            .expect_err("Should fail");

        assert!(matches!(err, UpdateError::Http { status: 500, .. }));
        assert_eq!(
            std::fs::read_dir(&target).expect("Should read dir").count(),
            0
        );
    }
}
