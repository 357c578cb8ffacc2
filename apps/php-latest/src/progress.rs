//! Single-line download progress for the terminal.
//!
//! ## Output Format
//!
//! ```text
//! Downloading https://github.com/.../php.tar.gz
//! 12.50 MB/48.00 MB (26%) 3.10 MB/s
//! ```

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use php_latest_updater::{ProgressCallback, ProgressEvent};

/// Returns a callback that redraws a progress line on stdout.
#[must_use]
pub fn terminal_progress() -> ProgressCallback {
    let total = Arc::new(AtomicU64::new(0));
    Arc::new(move |event| match event {
        ProgressEvent::Started { url, total: size } => {
            total.store(size, Ordering::Relaxed);
            println!("Downloading {url}");
        }
        ProgressEvent::Progress { downloaded, speed } => {
            print_progress(downloaded, total.load(Ordering::Relaxed), speed);
        }
        ProgressEvent::Completed => {
            println!();
            println!("Download complete, extracting...");
        }
        ProgressEvent::Failed { error } => {
            println!();
            eprintln!("Download failed: {error}");
        }
    })
}

fn print_progress(downloaded: u64, total: u64, speed: u64) {
    let downloaded_str = format_bytes(downloaded);
    let speed_str = format_speed(speed);
    if total > 0 {
        print!(
            "\r{downloaded_str}/{} ({}%) {speed_str}     ",
            format_bytes(total),
            percent(downloaded, total)
        );
    } else {
        print!("\r{downloaded_str} {speed_str}     ");
    }
    let _ = std::io::stdout().flush();
}

fn percent(downloaded: u64, total: u64) -> u64 {
    (downloaded.saturating_mul(100) / total).min(100)
}

/// Formats bytes into a human-readable string (KB, MB, GB).
fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    #[allow(clippy::cast_precision_loss)]
    let bytes_f = bytes as f64;

    if bytes_f >= GB {
        format!("{:.2} GB", bytes_f / GB)
    } else if bytes_f >= MB {
        format!("{:.2} MB", bytes_f / MB)
    } else if bytes_f >= KB {
        format!("{:.2} KB", bytes_f / KB)
    } else {
        format!("{bytes} B")
    }
}

/// Formats speed (bytes/sec) into a human-readable string.
fn format_speed(speed: u64) -> String {
    format!("{}/s", format_bytes(speed))
}
