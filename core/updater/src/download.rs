//! HTTP download of release assets.
//!
//! Assets are streamed to disk chunk by chunk; the whole archive is never
//! held in memory. Redirects are followed (release assets are usually served
//! from a CDN behind a redirect) and HTTPS is enforced unless the feed
//! configuration allows plain HTTP.
//!
//! Progress is reported through a [`ProgressCallback`], and the transfer can
//! be stopped at any chunk boundary with a [`CancellationToken`]. A failed or
//! cancelled download removes its partial file.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::errors::{UpdateError, UpdateResult};
use crate::release::http_client;

/// Progress event emitted during downloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Download has started.
    Started {
        /// The URL being downloaded.
        url: String,
        /// Total size in bytes, `0` when the server sent no `Content-Length`.
        total: u64,
    },
    /// Download progress update.
    Progress {
        /// Bytes downloaded so far.
        downloaded: u64,
        /// Current download speed in bytes per second.
        speed: u64,
    },
    /// Download completed successfully.
    Completed,
    /// Download failed with an error.
    Failed {
        /// Error description.
        error: String,
    },
}

/// Callback type for receiving progress updates during downloads.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Returns a callback that drops every event.
#[must_use]
pub fn silent_progress() -> ProgressCallback {
    Arc::new(|_| {})
}

/// Minimum interval between progress callback invocations in milliseconds.
const PROGRESS_CALLBACK_INTERVAL_MS: u128 = 100;

/// Options for a single download.
#[derive(Debug, Clone, Copy)]
pub struct DownloadOptions {
    /// Overall request timeout.
    pub timeout: Duration,
    /// Accept plain `http://` URLs.
    pub allow_http: bool,
}

/// Downloads `url` into `dest`, reporting progress to `callback`.
///
/// # Errors
///
/// Returns an error if:
/// - The host cannot be reached or the server answers with a non-success status
/// - The destination file cannot be created or written
/// - `cancel` fires before the transfer completes
pub async fn download_file(
    url: &str,
    dest: &Path,
    options: DownloadOptions,
    callback: ProgressCallback,
    cancel: &CancellationToken,
) -> UpdateResult<()> {
    match download_with_callback(url, dest, options, &callback, cancel).await {
        Ok(()) => {
            callback(ProgressEvent::Completed);
            Ok(())
        }
        Err(e) => {
            if let Err(remove_err) = tokio::fs::remove_file(dest).await
                && remove_err.kind() != std::io::ErrorKind::NotFound
            {
                tracing::warn!(
                    "Failed to remove partial download {}: {remove_err}",
                    dest.display()
                );
            }
            callback(ProgressEvent::Failed {
                error: e.to_string(),
            });
            Err(e)
        }
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn speed(downloaded: u64, started: Instant) -> u64 {
    let elapsed_secs = started.elapsed().as_secs_f64();
    if elapsed_secs > 0.0 {
        (downloaded as f64 / elapsed_secs) as u64
    } else {
        0
    }
}

async fn download_with_callback(
    url: &str,
    dest: &Path,
    options: DownloadOptions,
    callback: &ProgressCallback,
    cancel: &CancellationToken,
) -> UpdateResult<()> {
    let client = http_client(options.timeout, options.allow_http)?;

    let response = tokio::select! {
        () = cancel.cancelled() => return Err(UpdateError::cancelled(format!("download of {url}"))),
        response = client.get(url).send() => response.map_err(|e| UpdateError::from_request(url, e))?,
    };

    let status = response.status();
    if !status.is_success() {
        return Err(UpdateError::http(status.as_u16(), url));
    }

    let total_size = response.content_length().unwrap_or(0);
    callback(ProgressEvent::Started {
        url: url.to_string(),
        total: total_size,
    });

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| UpdateError::io("Failed to create file", dest, e))?;

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;
    let start_time = Instant::now();
    let mut last_callback_time = Instant::now();

    loop {
        let chunk = tokio::select! {
            () = cancel.cancelled() => return Err(UpdateError::cancelled(format!("download of {url}"))),
            chunk = stream.next() => chunk,
        };
        let Some(chunk) = chunk else { break };
        let chunk = chunk.map_err(|e| UpdateError::from_request(url, e))?;

        file.write_all(&chunk)
            .await
            .map_err(|e| UpdateError::io("Failed to write download", dest, e))?;
        downloaded += chunk.len() as u64;

        let now = Instant::now();
        if now.duration_since(last_callback_time).as_millis() >= PROGRESS_CALLBACK_INTERVAL_MS {
            callback(ProgressEvent::Progress {
                downloaded,
                speed: speed(downloaded, start_time),
            });
            last_callback_time = now;
        }
    }

    file.flush()
        .await
        .map_err(|e| UpdateError::io("Failed to flush download", dest, e))?;

    callback(ProgressEvent::Progress {
        downloaded,
        speed: speed(downloaded, start_time),
    });
    tracing::debug!("Downloaded {downloaded} bytes from {url}");

    Ok(())
}
